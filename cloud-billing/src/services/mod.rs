//! Services module for cloud-billing.

pub mod accounts;
pub mod billing;
pub mod catalog;
pub mod consumption;
pub mod database;
pub mod metrics;
pub mod reports;
pub mod store;

pub use accounts::AccountService;
pub use billing::BillingEngine;
pub use catalog::CatalogService;
pub use consumption::ConsumptionService;
pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use reports::ReportService;
pub use store::{DocumentStore, FileDocumentStore, MemoryDocumentStore};
