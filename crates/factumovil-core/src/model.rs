//! Domain records
//!
//! Row types mirror the production schema: senders own clients, products and
//! invoices; invoices own their items. Credential columns on `Sender` hold
//! opaque encrypted strings and never plaintext.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Empresa,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Self::Empresa
    }
}

/// User profile kept alongside the external auth provider's account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Auth provider user id
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Issuing company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    /// Owning auth-provider user
    pub user_id: Uuid,
    pub name: String,
    /// 11-digit tax id, unique across senders
    pub ruc: String,
    /// Encrypted SUNAT SOL username (opaque; either scheme)
    pub sunat_user_encrypted: Option<String>,
    /// Encrypted SUNAT SOL password (opaque; either scheme)
    pub sunat_pass_encrypted: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer of a sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub sender_id: i64,
    pub name: String,
    /// 8-digit national id, for boletas
    pub dni: Option<String>,
    /// 11-digit tax id, for facturas
    pub ruc: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog product of a sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sender_id: i64,
    pub description: String,
    pub unit: String,
    pub base_price: f64,
    pub has_igv: bool,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Receipt kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    Boleta,
    Factura,
    NotaCredito,
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Boleta => "BOLETA",
            Self::Factura => "FACTURA",
            Self::NotaCredito => "NOTA_CREDITO",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a receipt as it moves through SUNAT processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Borrador,
    Procesando,
    Aceptado,
    Rechazado,
    Anulado,
    Fallo,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Borrador => "BORRADOR",
            Self::Procesando => "PROCESANDO",
            Self::Aceptado => "ACEPTADO",
            Self::Rechazado => "RECHAZADO",
            Self::Anulado => "ANULADO",
            Self::Fallo => "FALLO",
        };
        f.write_str(s)
    }
}

/// Issued receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub sender_id: i64,
    pub client_id: Option<i64>,
    /// Client data denormalized at issue time
    pub client_name: Option<String>,
    pub client_document: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub series: String,
    /// Zero-padded correlative, unique per (sender, series)
    pub number: String,
    pub date: NaiveDate,
    pub subtotal: f64,
    pub igv: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    /// Processing-queue task id, when submitted
    pub task_id: Option<String>,
    pub pdf_base64: Option<String>,
    pub sunat_message: Option<String>,
    /// For credit notes: the corrected invoice
    pub referenced_invoice_id: Option<i64>,
    pub credit_note_reason: Option<String>,
    pub credit_note_sustento: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Receipt line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub has_igv: bool,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an invoice together with its items
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub sender_id: i64,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub client_document: Option<String>,
    pub invoice_type: InvoiceType,
    pub series: String,
    pub number: String,
    pub date: NaiveDate,
    pub subtotal: f64,
    pub igv: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub referenced_invoice_id: Option<i64>,
    pub credit_note_reason: Option<String>,
    pub credit_note_sustento: Option<String>,
    pub items: Vec<NewInvoiceItem>,
}

/// Input line for [`NewInvoice`]
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub product_id: Option<i64>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub has_igv: bool,
    pub total: f64,
}
