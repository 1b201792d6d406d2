//! Consumption events reported against instances.

use super::client::TaxId;
use crate::error::BillingError;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hours an instance consumed, as reported at `timestamp`. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub instance_id: i64,
    pub client_tax_id: TaxId,
    pub hours: Decimal,
    pub timestamp: NaiveDateTime,
}

/// Identity used to collapse duplicate reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumptionIdentity {
    pub instance_id: i64,
    pub client_tax_id: TaxId,
    pub timestamp: NaiveDateTime,
}

/// Identity used to recognise an event that was already invoiced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BilledIdentity {
    pub instance_id: i64,
    pub client_tax_id: TaxId,
    pub timestamp: NaiveDateTime,
    pub hours: Decimal,
}

impl ConsumptionEvent {
    pub fn identity(&self) -> ConsumptionIdentity {
        ConsumptionIdentity {
            instance_id: self.instance_id,
            client_tax_id: self.client_tax_id.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn billed_identity(&self) -> BilledIdentity {
        BilledIdentity {
            instance_id: self.instance_id,
            client_tax_id: self.client_tax_id.clone(),
            timestamp: self.timestamp,
            hours: self.hours.normalize(),
        }
    }
}

/// Input for recording consumption. Produced by the ingestion parser.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordConsumption {
    pub instance_id: i64,
    pub client_tax_id: String,
    pub hours: Decimal,
    pub timestamp: NaiveDateTime,
}

impl RecordConsumption {
    pub fn into_event(self) -> Result<ConsumptionEvent, BillingError> {
        if self.hours < Decimal::ZERO {
            return Err(BillingError::ValidationError(anyhow::anyhow!(
                "Consumed hours must not be negative, got {}",
                self.hours
            )));
        }

        Ok(ConsumptionEvent {
            instance_id: self.instance_id,
            client_tax_id: TaxId::parse(&self.client_tax_id)?,
            hours: self.hours,
            timestamp: self.timestamp,
        })
    }
}

/// Outcome of collapsing duplicate consumption events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeduplicationReport {
    pub examined: usize,
    pub surviving: usize,
    pub removed: usize,
}
