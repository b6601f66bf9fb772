//! Encryption passphrase configuration
//!
//! The shared passphrase is resolved once at startup and injected into the
//! cipher constructors. Crypto code never reads the environment on its own,
//! so tests can use deterministic passphrases without mutating the process
//! environment.

use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BackendError, Result};

/// Environment variable holding the shared encryption passphrase
pub const ENCRYPTION_KEY_ENV: &str = "FACTUMOVIL_ENCRYPTION_KEY";

/// Fallback passphrase used when the environment variable is unset.
///
/// Existing deployments shipped with this literal, so it stays; a loud
/// warning is emitted whenever it is actually used, and
/// [`EncryptionConfig::from_env_strict`] refuses it outright.
pub const DEFAULT_PASSPHRASE: &str = "CAMBIAR_EN_PRODUCCION";

/// The shared encryption passphrase - automatically zeroed when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the passphrase value (use carefully)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Passphrase").field(&"[REDACTED]").finish()
    }
}

/// Resolved encryption configuration for the process lifetime
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    passphrase: Passphrase,
    from_default: bool,
}

impl EncryptionConfig {
    /// Read the passphrase from the environment, falling back to
    /// [`DEFAULT_PASSPHRASE`] with a warning.
    pub fn from_env() -> Self {
        match std::env::var(ENCRYPTION_KEY_ENV) {
            Ok(value) if !value.is_empty() => Self {
                passphrase: Passphrase::new(value),
                from_default: false,
            },
            _ => {
                warn!(
                    "{} is not set; using the default encryption key. \
                     Configure it before storing real credentials",
                    ENCRYPTION_KEY_ENV
                );
                Self {
                    passphrase: Passphrase::new(DEFAULT_PASSPHRASE),
                    from_default: true,
                }
            }
        }
    }

    /// Like [`from_env`](Self::from_env), but the fallback passphrase is a
    /// hard error instead of a warning. Intended for production entry points.
    pub fn from_env_strict() -> Result<Self> {
        let config = Self::from_env();
        if config.from_default {
            return Err(BackendError::ConfigurationError(format!(
                "{} must be set",
                ENCRYPTION_KEY_ENV
            )));
        }
        Ok(config)
    }

    /// Build a configuration with an explicit passphrase (tests, embedding)
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Passphrase::new(passphrase),
            from_default: false,
        }
    }

    /// The resolved passphrase
    pub fn passphrase(&self) -> &Passphrase {
        &self.passphrase
    }

    /// Whether the insecure fallback passphrase is in use
    pub fn is_default_passphrase(&self) -> bool {
        self.from_default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_passphrase() {
        let config = EncryptionConfig::with_passphrase("hunter2");
        assert_eq!(config.passphrase().expose(), "hunter2");
        assert!(!config.is_default_passphrase());
    }

    #[test]
    fn test_debug_redacted() {
        let config = EncryptionConfig::with_passphrase("top-secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("top-secret"));
    }
}
