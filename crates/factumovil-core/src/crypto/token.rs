//! Self-describing encrypted token scheme
//!
//! Token layout, before encoding: version byte `0x80`, big-endian u64
//! timestamp (seconds), 16-byte IV, AES-128-CBC/PKCS7 ciphertext,
//! HMAC-SHA256 tag over all preceding bytes. The string form is URL-safe
//! base64 with padding. The 256-bit derived key splits in half: the first
//! 16 bytes sign, the last 16 encrypt.
//!
//! Tokens produced here are interchangeable with the ones already stored by
//! the previous producer deployment under the same passphrase.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::key_derivation::{derive_key, DerivedKey, TOKEN_SALT};
use crate::config::EncryptionConfig;
use crate::error::{BackendError, Result};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

pub(crate) const TOKEN_VERSION: u8 = 0x80;
const IV_SIZE: usize = 16;
const TAG_SIZE: usize = 32;
/// version + timestamp + IV + one cipher block + tag
pub(crate) const MIN_TOKEN_LEN: usize = 1 + 8 + IV_SIZE + 16 + TAG_SIZE;

/// Token cipher over the shared passphrase (scheme `TokenV1`)
pub struct TokenCipherV1 {
    config: EncryptionConfig,
    ttl: Option<std::time::Duration>,
}

impl TokenCipherV1 {
    /// Create a cipher from the resolved configuration
    pub fn new(config: EncryptionConfig) -> Self {
        Self { config, ttl: None }
    }

    /// Enforce a maximum token age during decryption.
    ///
    /// Off by default: stored credentials have no expiry, and the embedded
    /// timestamp is otherwise informational.
    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn derived(&self) -> DerivedKey {
        derive_key(self.config.passphrase().expose(), TOKEN_SALT)
    }

    /// Encrypt a credential string into a token.
    ///
    /// Empty input maps to `None`, mirroring the nullable credential columns.
    pub fn encrypt(&self, plaintext: &str) -> Result<Option<String>> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let key = self.derived();

        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let timestamp = Utc::now().timestamp().max(0) as u64;
        let token = self.seal(plaintext.as_bytes(), timestamp, &iv, &key)?;
        Ok(Some(token))
    }

    fn seal(
        &self,
        plaintext: &[u8],
        timestamp: u64,
        iv: &[u8; IV_SIZE],
        key: &DerivedKey,
    ) -> Result<String> {
        let encryptor = Aes128CbcEnc::new_from_slices(key.encryption_half(), iv)
            .map_err(|e| BackendError::EncryptionError(e.to_string()))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(1 + 8 + IV_SIZE + ciphertext.len() + TAG_SIZE);
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = <HmacSha256 as Mac>::new_from_slice(key.signing_half())
            .map_err(|e| BackendError::EncryptionError(e.to_string()))?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        Ok(URL_SAFE.encode(token))
    }

    /// Decrypt a token back into the credential string.
    ///
    /// Empty input maps to `None`. Malformed tokens are [`DecodeError`]s;
    /// a failed integrity check, a wrong passphrase, or an expired token
    /// (when a TTL is configured) is an [`AuthenticationError`].
    ///
    /// [`DecodeError`]: BackendError::DecodeError
    /// [`AuthenticationError`]: BackendError::AuthenticationError
    pub fn decrypt(&self, token: &str) -> Result<Option<String>> {
        if token.is_empty() {
            return Ok(None);
        }

        let raw = URL_SAFE
            .decode(token)
            .map_err(|e| BackendError::DecodeError(format!("invalid token base64: {}", e)))?;

        if raw.len() < MIN_TOKEN_LEN {
            return Err(BackendError::DecodeError(format!(
                "token too short: {} bytes",
                raw.len()
            )));
        }
        if raw[0] != TOKEN_VERSION {
            return Err(BackendError::DecodeError(format!(
                "unsupported token version: {:#04x}",
                raw[0]
            )));
        }

        let key = self.derived();
        let (body, tag) = raw.split_at(raw.len() - TAG_SIZE);

        let mut mac = <HmacSha256 as Mac>::new_from_slice(key.signing_half())
            .map_err(|e| BackendError::EncryptionError(e.to_string()))?;
        mac.update(body);
        mac.verify_slice(tag)
            .map_err(|_| BackendError::AuthenticationError)?;

        if let Some(ttl) = self.ttl {
            let mut ts = [0u8; 8];
            ts.copy_from_slice(&body[1..9]);
            let issued = u64::from_be_bytes(ts) as i64;
            let age = Utc::now().timestamp() - issued;
            if age > ttl.as_secs() as i64 {
                return Err(BackendError::AuthenticationError);
            }
        }

        let iv = &body[9..9 + IV_SIZE];
        let ciphertext = &body[9 + IV_SIZE..];
        if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
            return Err(BackendError::DecodeError(
                "ciphertext is not block-aligned".to_string(),
            ));
        }

        let decryptor = Aes128CbcDec::new_from_slices(key.encryption_half(), iv)
            .map_err(|e| BackendError::EncryptionError(e.to_string()))?;
        let plaintext = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| BackendError::AuthenticationError)?;

        let plaintext =
            String::from_utf8(plaintext).map_err(|e| BackendError::EncodingError(e.to_string()))?;
        Ok(Some(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> TokenCipherV1 {
        TokenCipherV1::new(EncryptionConfig::with_passphrase("test-passphrase"))
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = test_cipher();

        let token = cipher.encrypt("MODDATOS123").unwrap().unwrap();
        let decrypted = cipher.decrypt(&token).unwrap();

        assert_eq!(decrypted.as_deref(), Some("MODDATOS123"));
    }

    #[test]
    fn test_roundtrip_unicode() {
        let cipher = test_cipher();

        let plaintext = "contraseña-ñandú-書類-🔑";
        let token = cipher.encrypt(plaintext).unwrap().unwrap();

        assert_eq!(cipher.decrypt(&token).unwrap().as_deref(), Some(plaintext));
    }

    #[test]
    fn test_empty_input_is_sentinel_not_error() {
        let cipher = test_cipher();

        assert_eq!(cipher.encrypt("").unwrap(), None);
        assert_eq!(cipher.decrypt("").unwrap(), None);
    }

    #[test]
    fn test_tampered_token_fails_authentication() {
        let cipher = test_cipher();
        let token = cipher.encrypt("secret").unwrap().unwrap();

        let mut raw = URL_SAFE.decode(&token).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0xff;
        let tampered = URL_SAFE.encode(raw);

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(BackendError::AuthenticationError)
        ));
    }

    #[test]
    fn test_wrong_passphrase_fails_authentication() {
        let cipher = test_cipher();
        let token = cipher.encrypt("secret").unwrap().unwrap();

        let other = TokenCipherV1::new(EncryptionConfig::with_passphrase("other-passphrase"));
        assert!(matches!(
            other.decrypt(&token),
            Err(BackendError::AuthenticationError)
        ));
    }

    #[test]
    fn test_malformed_tokens_are_decode_errors() {
        let cipher = test_cipher();

        // not base64 at all
        assert!(matches!(
            cipher.decrypt("%%%not-base64%%%"),
            Err(BackendError::DecodeError(_))
        ));

        // valid base64, too short to be a token
        let short = URL_SAFE.encode([TOKEN_VERSION, 1, 2, 3]);
        assert!(matches!(
            cipher.decrypt(&short),
            Err(BackendError::DecodeError(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let cipher = test_cipher();
        let token = cipher.encrypt("secret").unwrap().unwrap();

        let mut raw = URL_SAFE.decode(&token).unwrap();
        raw[0] = 0x81;
        let wrong_version = URL_SAFE.encode(raw);

        assert!(matches!(
            cipher.decrypt(&wrong_version),
            Err(BackendError::DecodeError(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected_when_ttl_set() {
        let config = EncryptionConfig::with_passphrase("test-passphrase");
        let cipher = TokenCipherV1::new(config).with_ttl(std::time::Duration::from_secs(60));

        let key = cipher.derived();
        let iv = [7u8; IV_SIZE];
        let old_timestamp = (Utc::now().timestamp() - 3600) as u64;
        let stale = cipher.seal(b"secret", old_timestamp, &iv, &key).unwrap();

        assert!(matches!(
            cipher.decrypt(&stale),
            Err(BackendError::AuthenticationError)
        ));

        // Without a TTL the same token is still accepted.
        let lenient = test_cipher();
        assert_eq!(lenient.decrypt(&stale).unwrap().as_deref(), Some("secret"));
    }

    #[test]
    fn test_non_utf8_plaintext_is_encoding_error() {
        let cipher = test_cipher();

        let key = cipher.derived();
        let iv = [3u8; IV_SIZE];
        let token = cipher
            .seal(&[0xff, 0xfe, 0xfd], Utc::now().timestamp() as u64, &iv, &key)
            .unwrap();

        assert!(matches!(
            cipher.decrypt(&token),
            Err(BackendError::EncodingError(_))
        ));
    }

    #[test]
    fn test_fresh_ivs_produce_distinct_tokens() {
        let cipher = test_cipher();

        let token1 = cipher.encrypt("same input").unwrap().unwrap();
        let token2 = cipher.encrypt("same input").unwrap().unwrap();

        assert_ne!(token1, token2);
    }
}
