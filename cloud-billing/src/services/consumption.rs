//! Consumption ingest and deduplication.

use crate::error::BillingError;
use crate::models::{ConsumptionEvent, DeduplicationReport, RecordConsumption};
use crate::services::database::Database;
use crate::services::metrics::{record_consumption_ingested, record_duplicates_removed};
use std::collections::HashSet;
use tracing::{info, instrument};

/// Appends usage reports and collapses repeated ones. Events are not checked
/// against instances or clients; the billing run resolves them later.
#[derive(Clone)]
pub struct ConsumptionService {
    db: Database,
}

impl ConsumptionService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(instance_id = input.instance_id, tax_id = %input.client_tax_id))]
    pub async fn ingest(&self, input: RecordConsumption) -> Result<ConsumptionEvent, BillingError> {
        let event = input.into_event()?;
        let event = self
            .db
            .write("ingest_consumption", move |document| {
                document.consumptions.push(event.clone());
                Ok(event)
            })
            .await?;

        record_consumption_ingested("single", 1);
        info!(hours = %event.hours, timestamp = %event.timestamp, "Consumption recorded");
        Ok(event)
    }

    /// Append a parsed batch in one write. A single invalid entry rejects the
    /// whole batch.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn ingest_batch(
        &self,
        inputs: Vec<RecordConsumption>,
    ) -> Result<usize, BillingError> {
        let events = inputs
            .into_iter()
            .map(RecordConsumption::into_event)
            .collect::<Result<Vec<_>, _>>()?;
        let count = events.len();

        self.db
            .write("ingest_consumption_batch", move |document| {
                for event in events {
                    document.consumptions.push(event);
                }
                Ok(())
            })
            .await?;

        record_consumption_ingested("batch", count);
        info!(count = count, "Consumption batch recorded");
        Ok(count)
    }

    /// Keep the first event per (instance, client, timestamp) and drop the
    /// rest, preserving order. Running it again changes nothing.
    #[instrument(skip(self))]
    pub async fn deduplicate(&self) -> Result<DeduplicationReport, BillingError> {
        let report = self
            .db
            .write("deduplicate_consumption", |document| {
                let examined = document.consumptions.len();
                let mut seen = HashSet::with_capacity(examined);
                document
                    .consumptions
                    .retain(|event| seen.insert(event.identity()));
                let surviving = document.consumptions.len();

                Ok(DeduplicationReport {
                    examined,
                    surviving,
                    removed: examined - surviving,
                })
            })
            .await?;

        record_duplicates_removed(report.removed);
        info!(
            examined = report.examined,
            surviving = report.surviving,
            removed = report.removed,
            "Consumption deduplicated"
        );
        Ok(report)
    }

    pub async fn list_consumptions(&self) -> Result<Vec<ConsumptionEvent>, BillingError> {
        Ok(self.db.read("list_consumptions").await?.consumptions.to_vec())
    }

    pub async fn consumptions_for_instance(
        &self,
        instance_id: i64,
    ) -> Result<Vec<ConsumptionEvent>, BillingError> {
        let document = self.db.read("consumptions_for_instance").await?;
        Ok(document
            .consumptions
            .iter()
            .filter(|event| event.instance_id == instance_id)
            .cloned()
            .collect())
    }
}
