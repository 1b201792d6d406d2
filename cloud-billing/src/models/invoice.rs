//! Invoice model.

use super::client::TaxId;
use super::consumption::BilledIdentity;
use super::document::Keyed;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One priced (event, resource) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub instance_id: i64,
    pub instance_name: String,
    pub resource_id: i64,
    pub resource_name: String,
    /// Allocated quantity of the resource in the instance's configuration.
    pub quantity: Decimal,
    pub hours: Decimal,
    pub unit_rate: Decimal,
    pub line_total: Decimal,
    /// Timestamp of the consumption event this line was priced from.
    pub consumed_at: NaiveDateTime,
}

/// A client-scoped billing document. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub client_tax_id: TaxId,
    pub issue_date: NaiveDate,
    pub total: Decimal,
    pub line_items: Vec<LineItem>,
}

impl Keyed for Invoice {
    type Key = i64;

    fn key(&self) -> &i64 {
        &self.id
    }
}

impl Invoice {
    /// Identities of the consumption events this invoice billed.
    pub fn billed_identities(&self) -> impl Iterator<Item = BilledIdentity> + '_ {
        self.line_items.iter().map(move |line| BilledIdentity {
            instance_id: line.instance_id,
            client_tax_id: self.client_tax_id.clone(),
            timestamp: line.consumed_at,
            hours: line.hours.normalize(),
        })
    }
}
