//! Billing engine: turns unbilled consumption into invoices.

use crate::error::BillingError;
use crate::models::{
    BilledIdentity, BillingPeriod, BillingRun, ConsumptionEvent, Document, Invoice, LineItem,
    TaxId,
};
use crate::services::database::Database;
use crate::services::metrics::{record_invoice_generated, record_line_item_skipped};
use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

/// Generates invoices and answers invoice lookups.
///
/// Runs are expected to be issued one at a time. Each run reads and writes
/// the document under the writer lock, so two runs in the same process are
/// serialized and the second sees the first one's invoices.
#[derive(Clone)]
pub struct BillingEngine {
    db: Database,
}

impl BillingEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Bill every consumption event in `period` that belongs to an active
    /// instance and has not been billed before. One invoice per client.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty, start = %period.start(), end = %period.end()))]
    pub async fn generate_invoices(&self, period: BillingPeriod) -> Result<BillingRun, BillingError> {
        let run_id = Uuid::new_v4();
        Span::current().record("run_id", tracing::field::display(run_id));
        info!("Starting billing run");

        let issue_date = Utc::now().date_naive();
        let run = self
            .db
            .write("generate_invoices", move |document| {
                bill_period(document, run_id, period, issue_date)
            })
            .await?;

        for invoice in &run.invoices {
            if let Some(amount) = invoice.total.to_f64() {
                record_invoice_generated(amount);
            }
        }

        info!(
            invoices = run.invoices.len(),
            events_billed = run.events_billed,
            skipped_line_items = run.skipped_line_items,
            total = %run.total_billed(),
            "Billing run completed"
        );
        Ok(run)
    }

    /// Convenience wrapper over whole calendar days.
    pub async fn generate_invoices_for_dates(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<BillingRun, BillingError> {
        self.generate_invoices(BillingPeriod::from_dates(first, last)?)
            .await
    }

    pub async fn get_invoice(&self, id: i64) -> Result<Option<Invoice>, BillingError> {
        let document = self.db.read("get_invoice").await?;
        Ok(document.invoices.get(&id).cloned())
    }

    pub async fn list_invoices(&self) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.db.read("list_invoices").await?.invoices.to_vec())
    }

    pub async fn list_client_invoices(&self, tax_id: &str) -> Result<Vec<Invoice>, BillingError> {
        let tax_id = TaxId::parse(tax_id)?;
        let document = self.db.read("list_client_invoices").await?;
        Ok(document
            .invoices
            .iter()
            .filter(|invoice| invoice.client_tax_id == tax_id)
            .cloned()
            .collect())
    }
}

/// Events queued for one client, in the order they were encountered.
struct ClientBatch {
    client_tax_id: TaxId,
    events: Vec<ConsumptionEvent>,
}

fn bill_period(
    document: &mut Document,
    run_id: Uuid,
    period: BillingPeriod,
    issue_date: NaiveDate,
) -> Result<BillingRun, BillingError> {
    let mut billed: HashSet<BilledIdentity> = document
        .invoices
        .iter()
        .flat_map(Invoice::billed_identities)
        .collect();

    let mut batches: Vec<ClientBatch> = Vec::new();
    for event in &document.consumptions {
        if !period.contains(event.timestamp) {
            continue;
        }
        match document.instances.get(&event.instance_id) {
            Some(instance) if instance.is_active() => {}
            _ => continue,
        }
        if !billed.insert(event.billed_identity()) {
            continue;
        }

        match batches
            .iter_mut()
            .find(|batch| batch.client_tax_id == event.client_tax_id)
        {
            Some(batch) => batch.events.push(event.clone()),
            None => batches.push(ClientBatch {
                client_tax_id: event.client_tax_id.clone(),
                events: vec![event.clone()],
            }),
        }
    }

    let mut skipped_line_items = 0;
    let mut events_billed = 0;
    let mut invoices = Vec::new();

    for batch in batches {
        let mut line_items = Vec::new();
        for event in &batch.events {
            let priced = price_event(document, event, &mut skipped_line_items)?;
            if !priced.is_empty() {
                events_billed += 1;
            }
            line_items.extend(priced);
        }

        if line_items.is_empty() {
            warn!(client_tax_id = %batch.client_tax_id, "No billable line items for client");
            continue;
        }

        let total = line_items
            .iter()
            .try_fold(Decimal::ZERO, |total, line| total.checked_add(line.line_total))
            .ok_or_else(|| {
                BillingError::ValidationError(anyhow!(
                    "Invoice total for client {} overflows",
                    batch.client_tax_id
                ))
            })?;
        let invoice = Invoice {
            id: document.allocate_invoice_id(),
            client_tax_id: batch.client_tax_id,
            issue_date,
            total,
            line_items,
        };
        info!(
            invoice_id = invoice.id,
            client_tax_id = %invoice.client_tax_id,
            line_items = invoice.line_items.len(),
            total = %invoice.total,
            "Invoice generated"
        );
        document.invoices.push(invoice.clone());
        invoices.push(invoice);
    }

    Ok(BillingRun {
        run_id,
        period,
        invoices,
        events_billed,
        skipped_line_items,
    })
}

/// One line item per resource allocated to the event's configuration, in
/// allocation order. Missing references drop the affected lines; an amount
/// outside the decimal range fails the whole run.
fn price_event(
    document: &Document,
    event: &ConsumptionEvent,
    skipped: &mut usize,
) -> Result<Vec<LineItem>, BillingError> {
    let Some(instance) = document.instances.get(&event.instance_id) else {
        return Ok(Vec::new());
    };
    let Some(configuration) = document.configurations.get(&instance.configuration_id) else {
        warn!(
            instance_id = instance.id,
            configuration_id = instance.configuration_id,
            "Configuration missing at billing time, skipping event"
        );
        record_line_item_skipped("missing_configuration");
        *skipped += 1;
        return Ok(Vec::new());
    };

    let mut line_items = Vec::with_capacity(configuration.resources.len());
    for allocation in &configuration.resources {
        let Some(resource) = document.resources.get(&allocation.resource_id) else {
            warn!(
                configuration_id = configuration.id,
                resource_id = allocation.resource_id,
                "Resource missing at billing time, skipping line item"
            );
            record_line_item_skipped("missing_resource");
            *skipped += 1;
            continue;
        };

        let line_total = resource
            .hourly_rate
            .checked_mul(allocation.quantity)
            .and_then(|amount| amount.checked_mul(event.hours))
            .ok_or_else(|| {
                BillingError::ValidationError(anyhow!(
                    "Line total for instance {} and resource {} overflows",
                    instance.id,
                    resource.id
                ))
            })?;

        line_items.push(LineItem {
            instance_id: instance.id,
            instance_name: instance.name.clone(),
            resource_id: resource.id,
            resource_name: resource.name.clone(),
            quantity: allocation.quantity,
            hours: event.hours,
            unit_rate: resource.hourly_rate,
            line_total,
            consumed_at: event.timestamp,
        });
    }
    Ok(line_items)
}
