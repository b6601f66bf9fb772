//! Error types for factumovil-core

use thiserror::Error;

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Backend error types
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Malformed ciphertext: {0}")]
    DecodeError(String),

    #[error("Integrity check failed (wrong key or tampered ciphertext)")]
    AuthenticationError,

    #[error("Decrypted bytes are not valid UTF-8: {0}")]
    EncodingError(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Sender not found: {0}")]
    SenderNotFound(i64),

    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(i64),

    #[error("RUC already registered: {0}")]
    DuplicateRuc(String),

    #[error("Invoice number already used: {series}-{number}")]
    InvoiceNumberTaken { series: String, number: String },

    #[error("Insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: i64,
        available: i32,
        requested: i32,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
