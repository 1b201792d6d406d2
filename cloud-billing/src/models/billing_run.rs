//! Billing period and billing run result.

use super::invoice::Invoice;
use crate::error::BillingError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed interval `[start, end]` compared at full timestamp precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl BillingPeriod {
    /// Exact bounds, no normalisation.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, BillingError> {
        if start > end {
            return Err(BillingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whole days: from the start of `first` to the last millisecond of `last`.
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Result<Self, BillingError> {
        let end_of_day =
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Self::new(first.and_time(NaiveTime::MIN), last.and_time(end_of_day))
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// What one call to invoice generation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRun {
    pub run_id: Uuid,
    pub period: BillingPeriod,
    pub invoices: Vec<Invoice>,
    /// Consumption events priced into the new invoices.
    pub events_billed: usize,
    /// (event, allocation) pairs dropped because the configuration or
    /// resource no longer resolves.
    pub skipped_line_items: usize,
}

impl BillingRun {
    /// Sum of invoice totals, saturating at the decimal range.
    pub fn total_billed(&self) -> Decimal {
        self.invoices
            .iter()
            .fold(Decimal::ZERO, |total, invoice| total.saturating_add(invoice.total))
    }
}
