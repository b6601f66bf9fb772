//! Raw AEAD credential blobs
//!
//! Consumes values produced by the browser frontend: standard base64 of a
//! 12-byte random nonce followed by AES-256-GCM ciphertext and tag, with no
//! associated data. This deployment only decrypts; the encrypting half runs
//! in the frontend, sharing the passphrase and the hyphen-variant salt.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;

use super::key_derivation::{derive_key, RAW_AEAD_SALT};
use crate::config::EncryptionConfig;
use crate::error::{BackendError, Result};
use crate::model::Sender;

/// Nonce prefix length in the wire format (always exactly the first 12 bytes)
const NONCE_SIZE: usize = 12;

/// Outcome of a tolerant decrypt.
///
/// `success: false` always carries an empty value. `success: true` with an
/// empty value means the stored secret itself was empty - the distinction
/// the previous implementation collapsed into a bare `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptResult {
    pub success: bool,
    pub value: String,
}

impl DecryptResult {
    /// A successful decrypt (possibly of an empty secret)
    pub fn ok(value: String) -> Self {
        Self {
            success: true,
            value,
        }
    }

    /// A failed decrypt
    pub fn failed() -> Self {
        Self {
            success: false,
            value: String::new(),
        }
    }

    /// Default-to-empty fallback, the behavior callers may opt into
    pub fn into_value(self) -> String {
        self.value
    }
}

/// Decrypted SUNAT credential pair for one sender
#[derive(Debug)]
pub struct SunatCredentials {
    pub user: DecryptResult,
    pub password: DecryptResult,
}

/// Raw AEAD cipher over the shared passphrase (scheme `RawAeadV1`)
pub struct RawAeadCipherV1 {
    config: EncryptionConfig,
}

impl RawAeadCipherV1 {
    /// Create a cipher from the resolved configuration
    pub fn new(config: EncryptionConfig) -> Self {
        Self { config }
    }

    /// Strict decrypt: every failure is a typed error.
    ///
    /// Empty input is a genuinely empty secret, not an error.
    pub fn try_decrypt(&self, blob: &str) -> Result<String> {
        if blob.is_empty() {
            return Ok(String::new());
        }

        let combined = STANDARD
            .decode(blob)
            .map_err(|e| BackendError::DecodeError(format!("invalid credential base64: {}", e)))?;
        if combined.len() <= NONCE_SIZE {
            return Err(BackendError::DecodeError(format!(
                "credential blob too short: {} bytes",
                combined.len()
            )));
        }
        let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);

        let key = derive_key(self.config.passphrase().expose(), RAW_AEAD_SALT);
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| BackendError::EncryptionError(e.to_string()))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| BackendError::AuthenticationError)?;

        String::from_utf8(plaintext).map_err(|e| BackendError::EncodingError(e.to_string()))
    }

    /// Tolerant decrypt used at the repository boundary.
    ///
    /// Never propagates: failures are logged and reported through
    /// [`DecryptResult`] so callers can still tell a failed decrypt apart
    /// from a genuinely empty secret.
    pub fn decrypt(&self, blob: &str) -> DecryptResult {
        match self.try_decrypt(blob) {
            Ok(value) => DecryptResult::ok(value),
            Err(err) => {
                warn!("failed to decrypt stored credential: {}", err);
                DecryptResult::failed()
            }
        }
    }

    /// Decrypt both SUNAT credentials of a sender.
    ///
    /// A missing column counts as an empty secret, not a failure.
    pub fn credentials_for(&self, sender: &Sender) -> SunatCredentials {
        SunatCredentials {
            user: self.decrypt(sender.sunat_user_encrypted.as_deref().unwrap_or_default()),
            password: self.decrypt(sender.sunat_pass_encrypted.as_deref().unwrap_or_default()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Companion encryptor mirroring the frontend producer; production code
    //! never encrypts in this scheme.

    use super::*;

    pub(crate) fn encrypt_blob(config: &EncryptionConfig, nonce: &[u8; 12], plaintext: &str) -> String {
        let key = derive_key(config.passphrase().expose(), RAW_AEAD_SALT);
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).unwrap();

        let mut combined = nonce.to_vec();
        combined.extend(
            cipher
                .encrypt(Nonce::from_slice(nonce), plaintext.as_bytes())
                .unwrap(),
        );
        STANDARD.encode(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::encrypt_blob;
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn test_config() -> EncryptionConfig {
        EncryptionConfig::with_passphrase("test-passphrase")
    }

    fn test_cipher() -> RawAeadCipherV1 {
        RawAeadCipherV1::new(test_config())
    }

    #[test]
    fn test_known_plaintext_roundtrip() {
        let cipher = test_cipher();
        let blob = encrypt_blob(&test_config(), &[9u8; 12], "MODDATOS123");

        assert_eq!(cipher.try_decrypt(&blob).unwrap(), "MODDATOS123");
    }

    #[test]
    fn test_empty_input_yields_empty_success() {
        let cipher = test_cipher();

        assert_eq!(cipher.try_decrypt("").unwrap(), "");

        let result = cipher.decrypt("");
        assert!(result.success);
        assert_eq!(result.value, "");
    }

    #[test]
    fn test_corrupted_blob_reports_failure_not_panic() {
        let cipher = test_cipher();
        let blob = encrypt_blob(&test_config(), &[1u8; 12], "MODDATOS123");

        let mut combined = STANDARD.decode(&blob).unwrap();
        // flip one byte inside the ciphertext region
        combined[NONCE_SIZE + 2] ^= 0x01;
        let corrupted = STANDARD.encode(combined);

        assert!(matches!(
            cipher.try_decrypt(&corrupted),
            Err(BackendError::AuthenticationError)
        ));

        let result = cipher.decrypt(&corrupted);
        assert!(!result.success);
        assert_eq!(result.value, "");
    }

    #[test]
    fn test_wrong_passphrase_fails_deterministically() {
        let blob = encrypt_blob(&test_config(), &[4u8; 12], "S3cr3t!");

        let other = RawAeadCipherV1::new(EncryptionConfig::with_passphrase("rotated"));
        assert!(matches!(
            other.try_decrypt(&blob),
            Err(BackendError::AuthenticationError)
        ));
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let cipher = test_cipher();

        assert!(matches!(
            cipher.try_decrypt("not base64 at all!!"),
            Err(BackendError::DecodeError(_))
        ));
    }

    #[test]
    fn test_truncated_blob_is_decode_error() {
        let cipher = test_cipher();
        // 8 bytes: shorter than the nonce alone
        let short = STANDARD.encode([0u8; 8]);

        assert!(matches!(
            cipher.try_decrypt(&short),
            Err(BackendError::DecodeError(_))
        ));
    }

    #[test]
    fn test_credentials_for_tolerates_missing_fields() {
        let cipher = test_cipher();
        let now = Utc::now();
        let sender = Sender {
            id: 1,
            user_id: Uuid::new_v4(),
            name: "BODEGA DON PEPE SAC".to_string(),
            ruc: "20123456789".to_string(),
            sunat_user_encrypted: Some(encrypt_blob(&test_config(), &[2u8; 12], "SOL_USER_01")),
            sunat_pass_encrypted: None,
            created_at: now,
            updated_at: now,
        };

        let creds = cipher.credentials_for(&sender);
        assert!(creds.user.success);
        assert_eq!(creds.user.value, "SOL_USER_01");
        assert!(creds.password.success);
        assert_eq!(creds.password.value, "");
    }
}
