//! Revenue reporting over issued invoices.

use crate::error::BillingError;
use crate::models::{Document, RevenueLine, RevenueReport};
use crate::services::database::Database;
use anyhow::anyhow;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::instrument;

const UNATTRIBUTED: &str = "unattributed";

#[derive(Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Revenue from invoices issued between `from` and `to` inclusive,
    /// broken down by category, configuration and resource.
    #[instrument(skip(self))]
    pub async fn revenue_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<RevenueReport, BillingError> {
        if from > to {
            return Err(BillingError::InvalidRange {
                start: from.and_time(NaiveTime::MIN),
                end: to.and_time(NaiveTime::MIN),
            });
        }
        let document = self.db.read("revenue_report").await?;
        build_report(&document, from, to)
    }
}

fn add_amount(total: &mut Decimal, amount: Decimal) -> Result<(), BillingError> {
    *total = total.checked_add(amount).ok_or_else(|| {
        BillingError::ValidationError(anyhow!("Revenue total overflows the decimal range"))
    })?;
    Ok(())
}

fn build_report(
    document: &Document,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<RevenueReport, BillingError> {
    let mut by_category: HashMap<String, Decimal> = HashMap::new();
    let mut by_configuration: HashMap<String, Decimal> = HashMap::new();
    let mut by_resource: HashMap<String, Decimal> = HashMap::new();
    let mut invoice_count = 0;
    let mut total = Decimal::ZERO;

    for invoice in document
        .invoices
        .iter()
        .filter(|invoice| invoice.issue_date >= from && invoice.issue_date <= to)
    {
        invoice_count += 1;
        add_amount(&mut total, invoice.total)?;

        for line in &invoice.line_items {
            let configuration = document
                .instances
                .get(&line.instance_id)
                .and_then(|instance| document.configurations.get(&instance.configuration_id));
            let category = configuration
                .and_then(|configuration| document.categories.get(&configuration.category_id));

            let configuration_label = configuration
                .map(|c| c.name.clone())
                .unwrap_or_else(|| UNATTRIBUTED.to_string());
            let category_label = category
                .map(|c| c.name.clone())
                .unwrap_or_else(|| UNATTRIBUTED.to_string());

            add_amount(by_category.entry(category_label).or_default(), line.line_total)?;
            add_amount(
                by_configuration.entry(configuration_label).or_default(),
                line.line_total,
            )?;
            add_amount(
                by_resource.entry(line.resource_name.clone()).or_default(),
                line.line_total,
            )?;
        }
    }

    Ok(RevenueReport {
        from,
        to,
        invoice_count,
        total,
        by_category: ranked(by_category),
        by_configuration: ranked(by_configuration),
        by_resource: ranked(by_resource),
    })
}

/// Highest amount first; ties by label.
fn ranked(totals: HashMap<String, Decimal>) -> Vec<RevenueLine> {
    let mut lines: Vec<RevenueLine> = totals
        .into_iter()
        .map(|(label, amount)| RevenueLine { label, amount })
        .collect();
    lines.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.label.cmp(&b.label)));
    lines
}
