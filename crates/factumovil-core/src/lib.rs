//! # factumovil-core
//!
//! Administrative backend core for FactuMovil AI:
//! - two-scheme SUNAT credential encryption over a shared passphrase
//!   (self-describing tokens plus raw AES-GCM blobs from the frontend)
//! - sender/client/product/invoice records over a pluggable store
//! - demo seed data for provisioning environments

pub mod config;
pub mod crypto;
pub mod error;
pub mod model;
pub mod repository;
pub mod seed;
pub mod store;

pub use config::{EncryptionConfig, Passphrase, ENCRYPTION_KEY_ENV};
pub use crypto::{
    CredentialCipher, DecryptResult, RawAeadCipherV1, Scheme, SunatCredentials, TokenCipherV1,
};
pub use error::{BackendError, Result};
pub use repository::{EncryptedCredentials, Repository};
pub use seed::{seed_demo_data, SeedSummary};
pub use store::{JsonFileStore, RecordStore};
