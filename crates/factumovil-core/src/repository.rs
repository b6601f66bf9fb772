//! Data access over a [`RecordStore`]
//!
//! One repository covers all tables through generic row helpers. SUNAT
//! credentials are encrypted with the configured producer cipher before any
//! row reaches the store, and decrypted per field on the way out using the
//! format heuristic (stored columns carry no scheme discriminator).

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EncryptionConfig;
use crate::crypto::{CredentialCipher, DecryptResult, Scheme, SunatCredentials};
use crate::error::{BackendError, Result};
use crate::model::{
    Client, Invoice, InvoiceItem, InvoiceStatus, NewInvoice, Product, Role, Sender, UserProfile,
};
use crate::store::RecordStore;

const SENDER_PREFIX: &str = "sender:";
const CLIENT_PREFIX: &str = "client:";
const PRODUCT_PREFIX: &str = "product:";
const INVOICE_PREFIX: &str = "invoice:";
const INVOICE_ITEM_PREFIX: &str = "invoice_item:";
const PROFILE_PREFIX: &str = "profile:";

/// Encrypted credential pair as stored on a sender row
#[derive(Debug, Clone)]
pub struct EncryptedCredentials {
    pub sunat_user_encrypted: Option<String>,
    pub sunat_pass_encrypted: Option<String>,
}

/// Repository over the record store
pub struct Repository {
    store: Arc<dyn RecordStore>,
    config: EncryptionConfig,
    producer: CredentialCipher,
}

impl Repository {
    /// Create a repository.
    ///
    /// `producer_scheme` selects the cipher used when this side encrypts
    /// credentials for storage; decryption handles either scheme.
    pub fn new(
        store: Arc<dyn RecordStore>,
        config: EncryptionConfig,
        producer_scheme: Scheme,
    ) -> Self {
        let producer = CredentialCipher::new(producer_scheme, config.clone());
        Self {
            store,
            config,
            producer,
        }
    }

    // ==================== generic row helpers ====================

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, row: &T) -> Result<()> {
        self.store.put(key, &serde_json::to_vec(row)?).await
    }

    async fn list_rows<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for key in self.store.list_keys(prefix).await? {
            if let Some(data) = self.store.get(&key).await? {
                rows.push(serde_json::from_slice(&data)?);
            }
        }
        Ok(rows)
    }

    // ==================== senders ====================

    /// Register a sender, encrypting any SUNAT credentials before storage
    pub async fn create_sender(
        &self,
        user_id: Uuid,
        name: &str,
        ruc: &str,
        sunat_user: Option<&str>,
        sunat_pass: Option<&str>,
    ) -> Result<Sender> {
        if self.sender_by_ruc(ruc).await?.is_some() {
            return Err(BackendError::DuplicateRuc(ruc.to_string()));
        }

        let sunat_user_encrypted = match sunat_user {
            Some(user) => self.producer.encrypt(user)?,
            None => None,
        };
        let sunat_pass_encrypted = match sunat_pass {
            Some(pass) => self.producer.encrypt(pass)?,
            None => None,
        };

        let id = self.store.next_id("senders").await?;
        let now = Utc::now();
        let sender = Sender {
            id,
            user_id,
            name: name.to_string(),
            ruc: ruc.to_string(),
            sunat_user_encrypted,
            sunat_pass_encrypted,
            created_at: now,
            updated_at: now,
        };

        self.save(&format!("{}{}", SENDER_PREFIX, id), &sender)
            .await?;

        info!("Created sender {} ({})", sender.name, sender.ruc);
        Ok(sender)
    }

    /// Get a sender by id
    pub async fn sender(&self, id: i64) -> Result<Option<Sender>> {
        self.fetch(&format!("{}{}", SENDER_PREFIX, id)).await
    }

    /// Find a sender by RUC
    pub async fn sender_by_ruc(&self, ruc: &str) -> Result<Option<Sender>> {
        let senders: Vec<Sender> = self.list_rows(SENDER_PREFIX).await?;
        Ok(senders.into_iter().find(|s| s.ruc == ruc))
    }

    /// List senders, optionally scoped to one owning user
    pub async fn senders(&self, user_id: Option<Uuid>) -> Result<Vec<Sender>> {
        let mut senders: Vec<Sender> = self.list_rows(SENDER_PREFIX).await?;
        if let Some(user_id) = user_id {
            senders.retain(|s| s.user_id == user_id);
        }
        senders.sort_by_key(|s| s.id);
        Ok(senders)
    }

    /// Save an edited sender row, bumping `updated_at`.
    ///
    /// Credential columns must hold cipher output; use
    /// [`set_sunat_credentials`](Self::set_sunat_credentials) to change them.
    pub async fn update_sender(&self, mut sender: Sender) -> Result<Sender> {
        if self.sender(sender.id).await?.is_none() {
            return Err(BackendError::SenderNotFound(sender.id));
        }

        sender.updated_at = Utc::now();
        self.save(&format!("{}{}", SENDER_PREFIX, sender.id), &sender)
            .await?;
        Ok(sender)
    }

    /// Delete a sender and everything it owns
    pub async fn delete_sender(&self, id: i64) -> Result<()> {
        if self.sender(id).await?.is_none() {
            return Err(BackendError::SenderNotFound(id));
        }

        for client in self.clients(Some(id)).await? {
            self.store
                .delete(&format!("{}{}", CLIENT_PREFIX, client.id))
                .await?;
        }
        for product in self.products(Some(id)).await? {
            self.store
                .delete(&format!("{}{}", PRODUCT_PREFIX, product.id))
                .await?;
        }
        for invoice in self.invoices(Some(id), None).await? {
            self.delete_invoice(invoice.id).await?;
        }
        self.store.delete(&format!("{}{}", SENDER_PREFIX, id)).await?;

        info!("Deleted sender {} and its records", id);
        Ok(())
    }

    // ==================== SUNAT credentials ====================

    /// Encrypt and store a sender's SUNAT credentials.
    ///
    /// Values given replace the stored ones; `None` (or an empty string)
    /// clears the column. Plaintext never reaches the store.
    pub async fn set_sunat_credentials(
        &self,
        sender_id: i64,
        sunat_user: Option<&str>,
        sunat_pass: Option<&str>,
    ) -> Result<Sender> {
        let mut sender = self
            .sender(sender_id)
            .await?
            .ok_or(BackendError::SenderNotFound(sender_id))?;

        sender.sunat_user_encrypted = match sunat_user {
            Some(user) => self.producer.encrypt(user)?,
            None => None,
        };
        sender.sunat_pass_encrypted = match sunat_pass {
            Some(pass) => self.producer.encrypt(pass)?,
            None => None,
        };
        sender.updated_at = Utc::now();

        self.save(&format!("{}{}", SENDER_PREFIX, sender_id), &sender)
            .await?;

        info!("Updated SUNAT credentials for sender {}", sender_id);
        Ok(sender)
    }

    /// Load the opaque encrypted credential pair of a sender
    pub async fn encrypted_credentials(&self, sender_id: i64) -> Result<EncryptedCredentials> {
        let sender = self
            .sender(sender_id)
            .await?
            .ok_or(BackendError::SenderNotFound(sender_id))?;

        Ok(EncryptedCredentials {
            sunat_user_encrypted: sender.sunat_user_encrypted,
            sunat_pass_encrypted: sender.sunat_pass_encrypted,
        })
    }

    /// Decrypt a sender's SUNAT credentials.
    ///
    /// Each field is decrypted independently with the scheme the format
    /// heuristic picks for it; a missing column is an empty secret. Failures
    /// never propagate - they surface through [`DecryptResult::success`].
    pub async fn sunat_credentials(&self, sender_id: i64) -> Result<SunatCredentials> {
        let sender = self
            .sender(sender_id)
            .await?
            .ok_or(BackendError::SenderNotFound(sender_id))?;

        debug!("Decrypting SUNAT credentials for sender {}", sender_id);
        Ok(SunatCredentials {
            user: self.decrypt_stored(sender.sunat_user_encrypted.as_deref()),
            password: self.decrypt_stored(sender.sunat_pass_encrypted.as_deref()),
        })
    }

    fn decrypt_stored(&self, stored: Option<&str>) -> DecryptResult {
        match stored {
            None => DecryptResult::ok(String::new()),
            Some(value) => {
                let scheme = Scheme::detect(value);
                CredentialCipher::new(scheme, self.config.clone()).decrypt_tolerant(value)
            }
        }
    }

    // ==================== clients ====================

    pub async fn create_client(
        &self,
        sender_id: i64,
        name: &str,
        dni: Option<&str>,
        ruc: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Client> {
        if self.sender(sender_id).await?.is_none() {
            return Err(BackendError::SenderNotFound(sender_id));
        }

        let id = self.store.next_id("clients").await?;
        let now = Utc::now();
        let client = Client {
            id,
            sender_id,
            name: name.to_string(),
            dni: dni.map(str::to_string),
            ruc: ruc.map(str::to_string),
            phone: phone.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        self.save(&format!("{}{}", CLIENT_PREFIX, id), &client)
            .await?;
        Ok(client)
    }

    pub async fn client(&self, id: i64) -> Result<Option<Client>> {
        self.fetch(&format!("{}{}", CLIENT_PREFIX, id)).await
    }

    pub async fn clients(&self, sender_id: Option<i64>) -> Result<Vec<Client>> {
        let mut clients: Vec<Client> = self.list_rows(CLIENT_PREFIX).await?;
        if let Some(sender_id) = sender_id {
            clients.retain(|c| c.sender_id == sender_id);
        }
        clients.sort_by_key(|c| c.id);
        Ok(clients)
    }

    pub async fn update_client(&self, mut client: Client) -> Result<Client> {
        if self.client(client.id).await?.is_none() {
            return Err(BackendError::ClientNotFound(client.id));
        }

        client.updated_at = Utc::now();
        self.save(&format!("{}{}", CLIENT_PREFIX, client.id), &client)
            .await?;
        Ok(client)
    }

    pub async fn delete_client(&self, id: i64) -> Result<()> {
        self.store.delete(&format!("{}{}", CLIENT_PREFIX, id)).await
    }

    // ==================== products ====================

    pub async fn create_product(
        &self,
        sender_id: i64,
        description: &str,
        unit: &str,
        base_price: f64,
        has_igv: bool,
        stock: i32,
    ) -> Result<Product> {
        if self.sender(sender_id).await?.is_none() {
            return Err(BackendError::SenderNotFound(sender_id));
        }

        let id = self.store.next_id("products").await?;
        let now = Utc::now();
        let product = Product {
            id,
            sender_id,
            description: description.to_string(),
            unit: unit.to_string(),
            base_price,
            has_igv,
            stock,
            created_at: now,
            updated_at: now,
        };

        self.save(&format!("{}{}", PRODUCT_PREFIX, id), &product)
            .await?;
        Ok(product)
    }

    pub async fn product(&self, id: i64) -> Result<Option<Product>> {
        self.fetch(&format!("{}{}", PRODUCT_PREFIX, id)).await
    }

    pub async fn products(&self, sender_id: Option<i64>) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.list_rows(PRODUCT_PREFIX).await?;
        if let Some(sender_id) = sender_id {
            products.retain(|p| p.sender_id == sender_id);
        }
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    pub async fn update_product(&self, mut product: Product) -> Result<Product> {
        if self.product(product.id).await?.is_none() {
            return Err(BackendError::ProductNotFound(product.id));
        }

        product.updated_at = Utc::now();
        self.save(&format!("{}{}", PRODUCT_PREFIX, product.id), &product)
            .await?;
        Ok(product)
    }

    /// Subtract sold quantity from stock; stock never goes negative
    pub async fn decrement_stock(&self, product_id: i64, quantity: i32) -> Result<Product> {
        let mut product = self
            .product(product_id)
            .await?
            .ok_or(BackendError::ProductNotFound(product_id))?;

        if product.stock < quantity {
            return Err(BackendError::InsufficientStock {
                product_id,
                available: product.stock,
                requested: quantity,
            });
        }

        product.stock -= quantity;
        product.updated_at = Utc::now();
        self.save(&format!("{}{}", PRODUCT_PREFIX, product_id), &product)
            .await?;
        Ok(product)
    }

    pub async fn delete_product(&self, id: i64) -> Result<()> {
        self.store
            .delete(&format!("{}{}", PRODUCT_PREFIX, id))
            .await
    }

    // ==================== invoices ====================

    /// Next correlative for a series, zero-padded to 8 digits
    pub async fn next_number(&self, sender_id: i64, series: &str) -> Result<String> {
        let invoices = self.invoices(Some(sender_id), None).await?;
        let max = invoices
            .iter()
            .filter(|i| i.series == series)
            .filter_map(|i| i.number.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("{:08}", max + 1))
    }

    /// Create an invoice together with its items.
    ///
    /// The (sender, series, number) triple must be unused.
    pub async fn create_invoice(&self, new: NewInvoice) -> Result<Invoice> {
        if self.sender(new.sender_id).await?.is_none() {
            return Err(BackendError::SenderNotFound(new.sender_id));
        }

        let existing = self.invoices(Some(new.sender_id), None).await?;
        if existing
            .iter()
            .any(|i| i.series == new.series && i.number == new.number)
        {
            return Err(BackendError::InvoiceNumberTaken {
                series: new.series,
                number: new.number,
            });
        }

        let id = self.store.next_id("invoices").await?;
        let now = Utc::now();
        let invoice = Invoice {
            id,
            sender_id: new.sender_id,
            client_id: new.client_id,
            client_name: new.client_name,
            client_document: new.client_document,
            invoice_type: new.invoice_type,
            series: new.series,
            number: new.number,
            date: new.date,
            subtotal: new.subtotal,
            igv: new.igv,
            total: new.total,
            status: new.status,
            task_id: None,
            pdf_base64: None,
            sunat_message: None,
            referenced_invoice_id: new.referenced_invoice_id,
            credit_note_reason: new.credit_note_reason,
            credit_note_sustento: new.credit_note_sustento,
            created_at: now,
            updated_at: now,
        };

        self.save(&format!("{}{}", INVOICE_PREFIX, id), &invoice)
            .await?;

        for item in new.items {
            let item_id = self.store.next_id("invoice_items").await?;
            let row = InvoiceItem {
                id: item_id,
                invoice_id: id,
                product_id: item.product_id,
                description: item.description,
                quantity: item.quantity,
                unit: item.unit,
                unit_price: item.unit_price,
                has_igv: item.has_igv,
                total: item.total,
                created_at: now,
            };
            self.save(&format!("{}{}", INVOICE_ITEM_PREFIX, item_id), &row)
                .await?;
        }

        info!(
            "Created {} {}-{} for sender {}",
            invoice.invoice_type, invoice.series, invoice.number, invoice.sender_id
        );
        Ok(invoice)
    }

    pub async fn invoice(&self, id: i64) -> Result<Option<Invoice>> {
        self.fetch(&format!("{}{}", INVOICE_PREFIX, id)).await
    }

    pub async fn invoice_items(&self, invoice_id: i64) -> Result<Vec<InvoiceItem>> {
        let mut items: Vec<InvoiceItem> = self.list_rows(INVOICE_ITEM_PREFIX).await?;
        items.retain(|i| i.invoice_id == invoice_id);
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    /// List invoices, newest first, optionally filtered by sender and status
    pub async fn invoices(
        &self,
        sender_id: Option<i64>,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self.list_rows(INVOICE_PREFIX).await?;
        if let Some(sender_id) = sender_id {
            invoices.retain(|i| i.sender_id == sender_id);
        }
        if let Some(status) = status {
            invoices.retain(|i| i.status == status);
        }
        invoices.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(invoices)
    }

    /// Advance an invoice's processing state; optional fields only
    /// overwrite when given
    pub async fn update_invoice_status(
        &self,
        id: i64,
        status: InvoiceStatus,
        task_id: Option<String>,
        sunat_message: Option<String>,
        pdf_base64: Option<String>,
    ) -> Result<Invoice> {
        let mut invoice = self
            .invoice(id)
            .await?
            .ok_or(BackendError::InvoiceNotFound(id))?;

        invoice.status = status;
        if task_id.is_some() {
            invoice.task_id = task_id;
        }
        if sunat_message.is_some() {
            invoice.sunat_message = sunat_message;
        }
        if pdf_base64.is_some() {
            invoice.pdf_base64 = pdf_base64;
        }
        invoice.updated_at = Utc::now();

        self.save(&format!("{}{}", INVOICE_PREFIX, id), &invoice)
            .await?;
        Ok(invoice)
    }

    /// Delete an invoice and its items
    pub async fn delete_invoice(&self, id: i64) -> Result<()> {
        for item in self.invoice_items(id).await? {
            self.store
                .delete(&format!("{}{}", INVOICE_ITEM_PREFIX, item.id))
                .await?;
        }
        self.store
            .delete(&format!("{}{}", INVOICE_PREFIX, id))
            .await
    }

    // ==================== user profiles ====================

    /// Create or update a profile; an existing row keeps its `created_at`
    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        name: Option<&str>,
        role: Role,
    ) -> Result<UserProfile> {
        let key = format!("{}{}", PROFILE_PREFIX, user_id);
        let now = Utc::now();

        let profile = match self.fetch::<UserProfile>(&key).await? {
            Some(mut existing) => {
                existing.email = email.map(str::to_string).or(existing.email);
                existing.name = name.map(str::to_string).or(existing.name);
                existing.role = role;
                existing.updated_at = now;
                existing
            }
            None => UserProfile {
                id: user_id,
                email: email.map(str::to_string),
                name: name.map(str::to_string),
                role,
                created_at: now,
                updated_at: now,
            },
        };

        self.save(&key, &profile).await?;
        Ok(profile)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        self.fetch(&format!("{}{}", PROFILE_PREFIX, user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_support::encrypt_blob;
    use crate::model::{InvoiceType, NewInvoiceItem};
    use crate::store::JsonFileStore;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const PASSPHRASE: &str = "test-passphrase";

    fn repo_at(dir: &TempDir) -> Repository {
        let store = JsonFileStore::open(dir.path().join("factumovil.json")).unwrap();
        Repository::new(
            Arc::new(store),
            EncryptionConfig::with_passphrase(PASSPHRASE),
            Scheme::TokenV1,
        )
    }

    fn boleta(sender_id: i64, series: &str, number: &str) -> NewInvoice {
        NewInvoice {
            sender_id,
            client_id: None,
            client_name: Some("MARIA GARCIA LOPEZ".to_string()),
            client_document: Some("12345678".to_string()),
            invoice_type: InvoiceType::Boleta,
            series: series.to_string(),
            number: number.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
            subtotal: 42.37,
            igv: 7.63,
            total: 50.0,
            status: InvoiceStatus::Borrador,
            referenced_invoice_id: None,
            credit_note_reason: None,
            credit_note_sustento: None,
            items: vec![NewInvoiceItem {
                product_id: None,
                description: "ARROZ COSTEÑO 5KG".to_string(),
                quantity: 1.0,
                unit: "BOLSA".to_string(),
                unit_price: 18.64,
                has_igv: true,
                total: 22.0,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_sender_stores_no_plaintext() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(
                Uuid::new_v4(),
                "BODEGA DON PEPE SAC",
                "20123456789",
                Some("SOL_USER_01"),
                Some("S3cr3t!"),
            )
            .await
            .unwrap();

        let user_col = sender.sunat_user_encrypted.unwrap();
        let pass_col = sender.sunat_pass_encrypted.unwrap();
        assert!(!user_col.contains("SOL_USER_01"));
        assert!(!pass_col.contains("S3cr3t!"));
        assert_eq!(Scheme::detect(&user_col), Scheme::TokenV1);
    }

    #[tokio::test]
    async fn test_credentials_survive_persist_and_reload() {
        let dir = TempDir::new().unwrap();

        let sender_id = {
            let repo = repo_at(&dir);
            repo.create_sender(
                Uuid::new_v4(),
                "BODEGA DON PEPE SAC",
                "20123456789",
                Some("SOL_USER_01"),
                Some("S3cr3t!"),
            )
            .await
            .unwrap()
            .id
        };

        // fresh store + repository over the same file
        let repo = repo_at(&dir);
        let creds = repo.sunat_credentials(sender_id).await.unwrap();

        assert!(creds.user.success);
        assert_eq!(creds.user.value, "SOL_USER_01");
        assert!(creds.password.success);
        assert_eq!(creds.password.value, "S3cr3t!");
    }

    #[tokio::test]
    async fn test_duplicate_ruc_rejected() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);
        let user = Uuid::new_v4();

        repo.create_sender(user, "BODEGA DON PEPE SAC", "20123456789", None, None)
            .await
            .unwrap();

        let result = repo
            .create_sender(user, "OTRA BODEGA SAC", "20123456789", None, None)
            .await;
        assert!(matches!(result, Err(BackendError::DuplicateRuc(_))));
    }

    #[tokio::test]
    async fn test_senders_scoped_by_user() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        repo.create_sender(alice, "EMPRESA A", "20111111111", None, None)
            .await
            .unwrap();
        repo.create_sender(bob, "EMPRESA B", "20222222222", None, None)
            .await
            .unwrap();

        let mine = repo.senders(Some(alice)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "EMPRESA A");

        assert_eq!(repo.senders(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_are_empty_successes() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();

        let creds = repo.sunat_credentials(sender.id).await.unwrap();
        assert!(creds.user.success);
        assert_eq!(creds.user.value, "");
        assert!(creds.password.success);
        assert_eq!(creds.password.value, "");
    }

    #[tokio::test]
    async fn test_mixed_scheme_columns_decrypt_per_field() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);
        let config = EncryptionConfig::with_passphrase(PASSPHRASE);

        let mut sender = repo
            .create_sender(
                Uuid::new_v4(),
                "EMPRESA",
                "20111111111",
                Some("SOL_USER_01"),
                None,
            )
            .await
            .unwrap();

        // the password column was written by the frontend deployment
        sender.sunat_pass_encrypted = Some(encrypt_blob(&config, &[8u8; 12], "S3cr3t!"));
        repo.update_sender(sender.clone()).await.unwrap();

        let creds = repo.sunat_credentials(sender.id).await.unwrap();
        assert_eq!(creds.user.value, "SOL_USER_01");
        assert_eq!(creds.password.value, "S3cr3t!");
    }

    #[tokio::test]
    async fn test_corrupt_stored_credential_flags_failure() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let mut sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();
        sender.sunat_pass_encrypted = Some("QUJDREVGR0g=".to_string()); // valid base64, not a blob
        repo.update_sender(sender.clone()).await.unwrap();

        let creds = repo.sunat_credentials(sender.id).await.unwrap();
        assert!(!creds.password.success);
        assert_eq!(creds.password.value, "");
        // a failed field does not poison the other one
        assert!(creds.user.success);
    }

    #[tokio::test]
    async fn test_set_credentials_replaces_and_clears() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(
                Uuid::new_v4(),
                "EMPRESA",
                "20111111111",
                Some("OLD_USER"),
                Some("old-pass"),
            )
            .await
            .unwrap();

        repo.set_sunat_credentials(sender.id, Some("NEW_USER"), None)
            .await
            .unwrap();

        let creds = repo.sunat_credentials(sender.id).await.unwrap();
        assert_eq!(creds.user.value, "NEW_USER");
        assert_eq!(creds.password.value, "");

        let stored = repo.encrypted_credentials(sender.id).await.unwrap();
        assert!(stored.sunat_user_encrypted.is_some());
        assert!(stored.sunat_pass_encrypted.is_none());
    }

    #[tokio::test]
    async fn test_delete_sender_cascades() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();
        let client = repo
            .create_client(sender.id, "MARIA GARCIA LOPEZ", Some("12345678"), None, None)
            .await
            .unwrap();
        let product = repo
            .create_product(sender.id, "ARROZ COSTEÑO 5KG", "BOLSA", 22.0, true, 50)
            .await
            .unwrap();
        let invoice = repo
            .create_invoice(boleta(sender.id, "B001", "00000001"))
            .await
            .unwrap();

        repo.delete_sender(sender.id).await.unwrap();

        assert!(repo.sender(sender.id).await.unwrap().is_none());
        assert!(repo.client(client.id).await.unwrap().is_none());
        assert!(repo.product(product.id).await.unwrap().is_none());
        assert!(repo.invoice(invoice.id).await.unwrap().is_none());
        assert!(repo.invoice_items(invoice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decrement_stock_enforces_floor() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();
        let product = repo
            .create_product(sender.id, "ACEITE PRIMOR 1L", "UNIDAD", 12.5, true, 30)
            .await
            .unwrap();

        let product = repo.decrement_stock(product.id, 10).await.unwrap();
        assert_eq!(product.stock, 20);

        let result = repo.decrement_stock(product.id, 21).await;
        assert!(matches!(
            result,
            Err(BackendError::InsufficientStock { available: 20, .. })
        ));

        // failed decrement leaves stock untouched
        assert_eq!(repo.product(product.id).await.unwrap().unwrap().stock, 20);
    }

    #[tokio::test]
    async fn test_invoice_number_unique_per_sender_series() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();

        repo.create_invoice(boleta(sender.id, "B001", "00000001"))
            .await
            .unwrap();

        let result = repo
            .create_invoice(boleta(sender.id, "B001", "00000001"))
            .await;
        assert!(matches!(
            result,
            Err(BackendError::InvoiceNumberTaken { .. })
        ));

        // same number under a different series is fine
        repo.create_invoice(boleta(sender.id, "B002", "00000001"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_next_number_is_zero_padded_and_increments() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();

        assert_eq!(repo.next_number(sender.id, "B001").await.unwrap(), "00000001");

        repo.create_invoice(boleta(sender.id, "B001", "00000007"))
            .await
            .unwrap();

        assert_eq!(repo.next_number(sender.id, "B001").await.unwrap(), "00000008");
        // other series keep their own correlative
        assert_eq!(repo.next_number(sender.id, "F001").await.unwrap(), "00000001");
    }

    #[tokio::test]
    async fn test_update_invoice_status_keeps_unset_fields() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);

        let sender = repo
            .create_sender(Uuid::new_v4(), "EMPRESA", "20111111111", None, None)
            .await
            .unwrap();
        let invoice = repo
            .create_invoice(boleta(sender.id, "B001", "00000001"))
            .await
            .unwrap();

        let invoice = repo
            .update_invoice_status(
                invoice.id,
                InvoiceStatus::Procesando,
                Some("task-42".to_string()),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Procesando);
        assert_eq!(invoice.task_id.as_deref(), Some("task-42"));

        let invoice = repo
            .update_invoice_status(invoice.id, InvoiceStatus::Aceptado, None, None, None)
            .await
            .unwrap();
        // task id from the earlier update is preserved
        assert_eq!(invoice.task_id.as_deref(), Some("task-42"));
    }

    #[tokio::test]
    async fn test_upsert_profile_promotes_role() {
        let dir = TempDir::new().unwrap();
        let repo = repo_at(&dir);
        let user_id = Uuid::new_v4();

        let profile = repo
            .upsert_profile(user_id, Some("admin@factumovil.pe"), None, Role::Empresa)
            .await
            .unwrap();
        assert_eq!(profile.role, Role::Empresa);

        let profile = repo
            .upsert_profile(user_id, None, Some("Administrador"), Role::Admin)
            .await
            .unwrap();
        assert_eq!(profile.role, Role::Admin);
        // earlier email survives a partial upsert
        assert_eq!(profile.email.as_deref(), Some("admin@factumovil.pe"));
    }
}
