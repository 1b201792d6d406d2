//! Bulk import payloads and revenue reporting.

use super::catalog::{CreateCategory, CreateConfiguration, CreateResource, SetConfigurationResource};
use super::client::CreateClient;
use super::instance::CreateInstance;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An already-parsed configuration message. Applied with upsert semantics in
/// field order, so later entries may reference earlier ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogImport {
    #[serde(default)]
    pub resources: Vec<CreateResource>,
    #[serde(default)]
    pub categories: Vec<CreateCategory>,
    #[serde(default)]
    pub configurations: Vec<CreateConfiguration>,
    #[serde(default)]
    pub allocations: Vec<SetConfigurationResource>,
    #[serde(default)]
    pub clients: Vec<CreateClient>,
    #[serde(default)]
    pub instances: Vec<CreateInstance>,
}

/// Records written by one import, per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub resources: usize,
    pub categories: usize,
    pub configurations: usize,
    pub allocations: usize,
    pub clients: usize,
    pub instances: usize,
}

/// Revenue attributed to one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueLine {
    pub label: String,
    pub amount: Decimal,
}

/// Revenue from invoices issued in `[from, to]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub invoice_count: usize,
    pub total: Decimal,
    pub by_category: Vec<RevenueLine>,
    pub by_configuration: Vec<RevenueLine>,
    pub by_resource: Vec<RevenueLine>,
}
