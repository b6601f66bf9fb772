//! Demo data for provisioning test environments
//!
//! Mirrors the dataset the operations scripts load into a fresh database:
//! an admin profile, three senders with their catalogs and customers, and a
//! handful of accepted receipts. Seeding is idempotent per sender - a RUC
//! that already exists is skipped together with its dependent records.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::error::{BackendError, Result};
use crate::model::{InvoiceStatus, InvoiceType, NewInvoice, NewInvoiceItem, Role};
use crate::repository::Repository;

/// What the seeding pass actually inserted
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub senders: usize,
    pub clients: usize,
    pub products: usize,
    pub invoices: usize,
}

struct DemoProduct {
    description: &'static str,
    unit: &'static str,
    base_price: f64,
    has_igv: bool,
    stock: i32,
}

struct DemoClient {
    name: &'static str,
    dni: Option<&'static str>,
    ruc: Option<&'static str>,
    phone: &'static str,
}

struct DemoInvoice {
    client_idx: usize,
    invoice_type: InvoiceType,
    series: &'static str,
    number: &'static str,
    date: (i32, u32, u32),
    subtotal: f64,
    igv: f64,
    total: f64,
    /// (product_idx, quantity, unit_price, line_total)
    items: &'static [(usize, f64, f64, f64)],
}

struct DemoSender {
    name: &'static str,
    ruc: &'static str,
    products: &'static [DemoProduct],
    clients: &'static [DemoClient],
    invoices: &'static [DemoInvoice],
}

const fn product(
    description: &'static str,
    unit: &'static str,
    base_price: f64,
    stock: i32,
) -> DemoProduct {
    DemoProduct {
        description,
        unit,
        base_price,
        has_igv: true,
        stock,
    }
}

static DEMO_SENDERS: &[DemoSender] = &[
    DemoSender {
        name: "BODEGA DON PEPE SAC",
        ruc: "20123456789",
        products: &[
            product("ARROZ COSTEÑO 5KG", "BOLSA", 22.00, 50),
            product("ACEITE PRIMOR 1L", "UNIDAD", 12.50, 30),
            product("AZUCAR RUBIA 1KG", "KILOGRAMO", 4.50, 100),
            product("LECHE GLORIA 400G", "UNIDAD", 4.20, 80),
            product("FIDEOS DON VITTORIO 500G", "UNIDAD", 3.80, 60),
            product("ATUN FLORIDA 170G", "UNIDAD", 6.50, 40),
            product("PAPA BLANCA", "KILOGRAMO", 3.50, 200),
            product("CEBOLLA ROJA", "KILOGRAMO", 4.00, 150),
        ],
        clients: &[
            DemoClient {
                name: "MARIA GARCIA LOPEZ",
                dni: Some("12345678"),
                ruc: None,
                phone: "987654321",
            },
            DemoClient {
                name: "JUAN PEREZ CASTRO",
                dni: Some("87654321"),
                ruc: None,
                phone: "912345678",
            },
            DemoClient {
                name: "RESTAURANT EL BUEN SABOR SAC",
                dni: None,
                ruc: Some("20111222333"),
                phone: "014567890",
            },
        ],
        invoices: &[
            DemoInvoice {
                client_idx: 0,
                invoice_type: InvoiceType::Boleta,
                series: "B001",
                number: "00000001",
                date: (2026, 1, 3),
                subtotal: 42.37,
                igv: 7.63,
                total: 50.00,
                items: &[
                    (0, 1.0, 18.64, 22.00),
                    (1, 1.0, 10.59, 12.50),
                    (2, 2.0, 3.81, 9.00),
                    (3, 1.0, 3.56, 4.20),
                ],
            },
            DemoInvoice {
                client_idx: 1,
                invoice_type: InvoiceType::Boleta,
                series: "B001",
                number: "00000002",
                date: (2026, 1, 4),
                subtotal: 84.75,
                igv: 15.25,
                total: 100.00,
                items: &[
                    (0, 2.0, 18.64, 44.00),
                    (6, 5.0, 2.97, 17.50),
                    (7, 3.0, 3.39, 12.00),
                    (4, 3.0, 3.22, 11.40),
                ],
            },
            DemoInvoice {
                client_idx: 2,
                invoice_type: InvoiceType::Factura,
                series: "F001",
                number: "00000001",
                date: (2026, 1, 5),
                subtotal: 254.24,
                igv: 45.76,
                total: 300.00,
                items: &[
                    (0, 5.0, 18.64, 110.00),
                    (1, 5.0, 10.59, 62.50),
                    (5, 10.0, 5.51, 65.00),
                    (3, 10.0, 3.56, 42.00),
                ],
            },
        ],
    },
    DemoSender {
        name: "MINIMARKET LA ESQUINA EIRL",
        ruc: "20987654321",
        products: &[
            product("GASEOSA COCA COLA 500ML", "UNIDAD", 3.00, 100),
            product("GASEOSA INCA KOLA 500ML", "UNIDAD", 3.00, 100),
            product("AGUA SAN LUIS 625ML", "UNIDAD", 2.00, 150),
            product("GALLETAS OREO", "UNIDAD", 2.50, 80),
            product("CHOCOLATE SUBLIME", "UNIDAD", 2.00, 60),
            product("CIGARROS HAMILTON", "UNIDAD", 1.50, 200),
            DemoProduct {
                description: "PAN FRANCES",
                unit: "UNIDAD",
                base_price: 0.30,
                has_igv: false,
                stock: 500,
            },
            product("YOGURT GLORIA 1L", "UNIDAD", 7.50, 40),
        ],
        clients: &[
            DemoClient {
                name: "CARLOS MENDOZA RIOS",
                dni: Some("11223344"),
                ruc: None,
                phone: "999888777",
            },
            DemoClient {
                name: "ANA TORRES SILVA",
                dni: Some("44332211"),
                ruc: None,
                phone: "966555444",
            },
        ],
        invoices: &[
            DemoInvoice {
                client_idx: 0,
                invoice_type: InvoiceType::Boleta,
                series: "B001",
                number: "00000001",
                date: (2026, 1, 3),
                subtotal: 25.42,
                igv: 4.58,
                total: 30.00,
                items: &[
                    (0, 3.0, 2.54, 9.00),
                    (2, 2.0, 1.69, 4.00),
                    (3, 2.0, 2.12, 5.00),
                    (6, 20.0, 0.30, 6.00),
                ],
            },
            DemoInvoice {
                client_idx: 1,
                invoice_type: InvoiceType::Boleta,
                series: "B001",
                number: "00000002",
                date: (2026, 1, 4),
                subtotal: 16.95,
                igv: 3.05,
                total: 20.00,
                items: &[
                    (1, 2.0, 2.54, 6.00),
                    (4, 3.0, 1.69, 6.00),
                    (7, 1.0, 6.36, 7.50),
                ],
            },
        ],
    },
    DemoSender {
        name: "DISTRIBUIDORA CENTRAL SAC",
        ruc: "20456789123",
        products: &[
            product("ARROZ COSTEÑO 50KG", "SACO", 180.00, 20),
            product("ACEITE PRIMOR CAJA 12U", "CAJA", 140.00, 15),
            product("AZUCAR RUBIA 50KG", "SACO", 200.00, 25),
            product("LECHE GLORIA CAJA 48U", "CAJA", 190.00, 10),
            product("FIDEOS DON VITTORIO CAJA 20U", "CAJA", 70.00, 30),
            product("DETERGENTE BOLIVAR 15KG", "BOLSA", 85.00, 40),
        ],
        clients: &[
            DemoClient {
                name: "BODEGA DON PEPE SAC",
                dni: None,
                ruc: Some("20123456789"),
                phone: "014445566",
            },
            DemoClient {
                name: "MINIMARKET LA ESQUINA EIRL",
                dni: None,
                ruc: Some("20987654321"),
                phone: "017778899",
            },
            DemoClient {
                name: "TIENDA ROSITA EIRL",
                dni: None,
                ruc: Some("20333444555"),
                phone: "016667788",
            },
        ],
        invoices: &[
            DemoInvoice {
                client_idx: 0,
                invoice_type: InvoiceType::Factura,
                series: "F001",
                number: "00000001",
                date: (2026, 1, 2),
                subtotal: 847.46,
                igv: 152.54,
                total: 1000.00,
                items: &[
                    (0, 3.0, 152.54, 540.00),
                    (1, 2.0, 118.64, 280.00),
                    (2, 1.0, 169.49, 200.00),
                ],
            },
            DemoInvoice {
                client_idx: 1,
                invoice_type: InvoiceType::Factura,
                series: "F001",
                number: "00000002",
                date: (2026, 1, 3),
                subtotal: 423.73,
                igv: 76.27,
                total: 500.00,
                items: &[
                    (3, 1.0, 161.02, 190.00),
                    (4, 2.0, 59.32, 140.00),
                    (5, 2.0, 72.03, 170.00),
                ],
            },
        ],
    },
];

/// Populate the demo dataset for the given admin user
pub async fn seed_demo_data(repo: &Repository, admin_user_id: Uuid) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    repo.upsert_profile(
        admin_user_id,
        Some("admin@factumovil.pe"),
        Some("Administrador"),
        Role::Admin,
    )
    .await?;

    for demo in DEMO_SENDERS {
        let sender = match repo
            .create_sender(admin_user_id, demo.name, demo.ruc, None, None)
            .await
        {
            Ok(sender) => sender,
            Err(BackendError::DuplicateRuc(ruc)) => {
                info!("Sender {} already seeded, skipping", ruc);
                continue;
            }
            Err(err) => return Err(err),
        };
        summary.senders += 1;

        let mut products = Vec::with_capacity(demo.products.len());
        for p in demo.products {
            let created = repo
                .create_product(sender.id, p.description, p.unit, p.base_price, p.has_igv, p.stock)
                .await?;
            products.push(created);
            summary.products += 1;
        }

        let mut clients = Vec::with_capacity(demo.clients.len());
        for c in demo.clients {
            let created = repo
                .create_client(sender.id, c.name, c.dni, c.ruc, Some(c.phone))
                .await?;
            clients.push(created);
            summary.clients += 1;
        }

        for inv in demo.invoices {
            let client = &clients[inv.client_idx];
            let (year, month, day) = inv.date;
            let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                BackendError::StorageError(format!("invalid seed date {}-{}-{}", year, month, day))
            })?;

            let items = inv
                .items
                .iter()
                .map(|&(product_idx, quantity, unit_price, total)| {
                    let product = &products[product_idx];
                    NewInvoiceItem {
                        product_id: Some(product.id),
                        description: product.description.clone(),
                        quantity,
                        unit: product.unit.clone(),
                        unit_price,
                        has_igv: product.has_igv,
                        total,
                    }
                })
                .collect();

            repo.create_invoice(NewInvoice {
                sender_id: sender.id,
                client_id: Some(client.id),
                client_name: Some(client.name.clone()),
                client_document: client.ruc.clone().or_else(|| client.dni.clone()),
                invoice_type: inv.invoice_type,
                series: inv.series.to_string(),
                number: inv.number.to_string(),
                date,
                subtotal: inv.subtotal,
                igv: inv.igv,
                total: inv.total,
                status: InvoiceStatus::Aceptado,
                referenced_invoice_id: None,
                credit_note_reason: None,
                credit_note_sustento: None,
                items,
            })
            .await?;
            summary.invoices += 1;
        }
    }

    info!(
        "Seeded {} senders, {} clients, {} products, {} invoices",
        summary.senders, summary.clients, summary.products, summary.invoices
    );
    Ok(summary)
}
