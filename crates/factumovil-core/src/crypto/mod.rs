//! SUNAT credential encryption
//!
//! Two independent schemes protect credentials at rest, both keyed from the
//! shared passphrase through PBKDF2:
//! - [`TokenCipherV1`] - self-describing tokens produced by this backend
//! - [`RawAeadCipherV1`] - nonce-prefixed AES-GCM blobs produced by the
//!   frontend deployment
//!
//! The schemes are not interoperable: they use different salts and wire
//! formats. Stored columns carry no discriminator, so [`Scheme::detect`]
//! exists for values whose producer is unknown.

mod key_derivation;
mod raw_aead;
mod token;

pub use key_derivation::{derive_key, DerivedKey, PBKDF2_ITERATIONS, RAW_AEAD_SALT, TOKEN_SALT};
pub use raw_aead::{DecryptResult, RawAeadCipherV1, SunatCredentials};
pub use token::TokenCipherV1;

#[cfg(test)]
pub(crate) use raw_aead::test_support;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use tracing::warn;

use crate::config::EncryptionConfig;
use crate::error::{BackendError, Result};

/// Which encryption scheme produced a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    TokenV1,
    RawAeadV1,
}

impl Scheme {
    /// Guess the scheme of a stored value.
    ///
    /// Tokens are URL-safe base64 whose first decoded byte is the `0x80`
    /// version marker and which meet the minimum token length; anything else
    /// is treated as a raw AEAD blob. A raw blob that happens to be valid in
    /// both base64 alphabets (no `+` or `/`) and starts with `0x80` once
    /// decoded is misclassified - roughly 1 in 256 of such blobs. Values
    /// stored without a discriminator cannot do better; callers that know
    /// the producer should select the scheme explicitly.
    pub fn detect(stored: &str) -> Scheme {
        match URL_SAFE.decode(stored) {
            Ok(raw) if raw.len() >= token::MIN_TOKEN_LEN && raw[0] == token::TOKEN_VERSION => {
                Scheme::TokenV1
            }
            _ => Scheme::RawAeadV1,
        }
    }
}

/// A configured cipher, selected explicitly by the caller
pub enum CredentialCipher {
    TokenV1(TokenCipherV1),
    RawAeadV1(RawAeadCipherV1),
}

impl CredentialCipher {
    /// Build the cipher for a scheme over the resolved configuration
    pub fn new(scheme: Scheme, config: EncryptionConfig) -> Self {
        match scheme {
            Scheme::TokenV1 => Self::TokenV1(TokenCipherV1::new(config)),
            Scheme::RawAeadV1 => Self::RawAeadV1(RawAeadCipherV1::new(config)),
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Self::TokenV1(_) => Scheme::TokenV1,
            Self::RawAeadV1(_) => Scheme::RawAeadV1,
        }
    }

    /// Encrypt a credential for storage. Empty input maps to `None`.
    ///
    /// Only the token scheme has a local producer; raw AEAD values are
    /// created by the frontend deployment, so asking this side to produce
    /// one is an error rather than a silent wrong-format write.
    pub fn encrypt(&self, plaintext: &str) -> Result<Option<String>> {
        match self {
            Self::TokenV1(cipher) => cipher.encrypt(plaintext),
            Self::RawAeadV1(_) => Err(BackendError::EncryptionError(
                "raw AEAD credentials are produced by the frontend deployment".to_string(),
            )),
        }
    }

    /// Strict decrypt of a stored value. Empty stored values come back as
    /// `None` from either scheme.
    pub fn decrypt(&self, stored: &str) -> Result<Option<String>> {
        match self {
            Self::TokenV1(cipher) => cipher.decrypt(stored),
            Self::RawAeadV1(cipher) => {
                if stored.is_empty() {
                    return Ok(None);
                }
                cipher.try_decrypt(stored).map(Some)
            }
        }
    }

    /// Tolerant decrypt: failures are logged and reported through
    /// [`DecryptResult`] instead of propagating.
    pub fn decrypt_tolerant(&self, stored: &str) -> DecryptResult {
        match self {
            Self::RawAeadV1(cipher) => cipher.decrypt(stored),
            Self::TokenV1(cipher) => match cipher.decrypt(stored) {
                Ok(value) => DecryptResult::ok(value.unwrap_or_default()),
                Err(err) => {
                    warn!("failed to decrypt stored credential: {}", err);
                    DecryptResult::failed()
                }
            },
        }
    }
}
