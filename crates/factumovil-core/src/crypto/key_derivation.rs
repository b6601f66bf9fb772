//! Password-based key derivation using PBKDF2-HMAC-SHA256

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// PBKDF2 iteration count shared by both credential schemes
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt for the token cipher (underscore variant).
///
/// Differs from [`RAW_AEAD_SALT`] by one character, so the two schemes
/// derive different keys from the same passphrase. Both deployments shipped
/// with these exact literals and every stored value depends on them;
/// changing either one breaks decryption of existing records.
pub const TOKEN_SALT: &[u8] = b"factumovil_salt_v1";

/// Salt for the raw AEAD scheme (hyphen variant). See [`TOKEN_SALT`].
pub const RAW_AEAD_SALT: &[u8] = b"factumovil-salt-v1";

/// 256-bit symmetric key - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// First half: HMAC signing key for the token cipher
    pub(crate) fn signing_half(&self) -> &[u8] {
        &self.key[..16]
    }

    /// Second half: AES-128 encryption key for the token cipher
    pub(crate) fn encryption_half(&self) -> &[u8] {
        &self.key[16..]
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from the shared passphrase and a scheme salt.
///
/// Deterministic: identical inputs always produce identical keys. The key is
/// recomputed on every encrypt/decrypt call rather than cached, matching the
/// deployed behavior.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> DerivedKey {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    DerivedKey { key }
}
