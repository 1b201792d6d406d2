//! Client accounts and the instances they own.

use crate::error::BillingError;
use crate::models::{Client, CreateClient, CreateInstance, Document, Instance, TaxId, Upsert};
use crate::services::database::Database;
use crate::services::metrics::record_operation;
use chrono::NaiveDate;
use tracing::{info, instrument, warn};

/// The owner and configuration of an instance must both exist.
pub(crate) fn check_instance_references(
    document: &Document,
    instance: &Instance,
) -> Result<(), BillingError> {
    if !document.clients.contains(&instance.client_tax_id) {
        return Err(BillingError::ReferenceError(anyhow::anyhow!(
            "Instance {} references unknown client {}",
            instance.id,
            instance.client_tax_id
        )));
    }
    if !document.configurations.contains(&instance.configuration_id) {
        return Err(BillingError::ReferenceError(anyhow::anyhow!(
            "Instance {} references unknown configuration {}",
            instance.id,
            instance.configuration_id
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    db: Database,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Client Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(tax_id = %input.tax_id))]
    pub async fn create_client(&self, input: CreateClient) -> Result<Client, BillingError> {
        let client = input.into_client()?;
        let client = self
            .db
            .write("create_client", move |document| {
                if document.clients.contains(&client.tax_id) {
                    return Err(BillingError::DuplicateKey(anyhow::anyhow!(
                        "Client {} already exists",
                        client.tax_id
                    )));
                }
                document.clients.push(client.clone());
                Ok(client)
            })
            .await?;

        record_operation("client", "created");
        info!(username = %client.username, "Client created");
        Ok(client)
    }

    #[instrument(skip(self, input), fields(tax_id = %input.tax_id))]
    pub async fn upsert_client(&self, input: CreateClient) -> Result<Client, BillingError> {
        let client = input.into_client()?;
        let (client, outcome) = self
            .db
            .write("upsert_client", move |document| {
                let outcome = document.clients.upsert(client.clone());
                Ok((client, outcome))
            })
            .await?;

        record_operation("client", upsert_label(outcome));
        Ok(client)
    }

    /// Look up a client. The tax id is parsed first, so a malformed id is a
    /// validation error rather than a miss.
    pub async fn get_client(&self, tax_id: &str) -> Result<Option<Client>, BillingError> {
        let tax_id = TaxId::parse(tax_id)?;
        let document = self.db.read("get_client").await?;
        Ok(document.clients.get(&tax_id).cloned())
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, BillingError> {
        Ok(self.db.read("list_clients").await?.clients.to_vec())
    }

    // =========================================================================
    // Instance Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(instance_id = input.id, tax_id = %input.client_tax_id))]
    pub async fn create_instance(&self, input: CreateInstance) -> Result<Instance, BillingError> {
        let instance = input.into_instance()?;
        let instance = self
            .db
            .write("create_instance", move |document| {
                if document.instances.contains(&instance.id) {
                    return Err(BillingError::DuplicateKey(anyhow::anyhow!(
                        "Instance {} already exists",
                        instance.id
                    )));
                }
                check_instance_references(document, &instance)?;
                document.instances.push(instance.clone());
                Ok(instance)
            })
            .await?;

        record_operation("instance", "created");
        info!(state = instance.state.as_str(), "Instance created");
        Ok(instance)
    }

    #[instrument(skip(self, input), fields(instance_id = input.id, tax_id = %input.client_tax_id))]
    pub async fn upsert_instance(&self, input: CreateInstance) -> Result<Instance, BillingError> {
        let instance = input.into_instance()?;
        let (instance, outcome) = self
            .db
            .write("upsert_instance", move |document| {
                check_instance_references(document, &instance)?;
                let outcome = document.instances.upsert(instance.clone());
                Ok((instance, outcome))
            })
            .await?;

        record_operation("instance", upsert_label(outcome));
        Ok(instance)
    }

    pub async fn get_instance(&self, id: i64) -> Result<Option<Instance>, BillingError> {
        let document = self.db.read("get_instance").await?;
        Ok(document.instances.get(&id).cloned())
    }

    pub async fn list_instances(&self) -> Result<Vec<Instance>, BillingError> {
        Ok(self.db.read("list_instances").await?.instances.to_vec())
    }

    /// Instances owned by one client, in insertion order.
    pub async fn list_client_instances(&self, tax_id: &str) -> Result<Vec<Instance>, BillingError> {
        let tax_id = TaxId::parse(tax_id)?;
        let document = self.db.read("list_client_instances").await?;
        Ok(document
            .instances
            .iter()
            .filter(|instance| instance.client_tax_id == tax_id)
            .cloned()
            .collect())
    }

    /// Mark an instance cancelled as of `cancellation_date`. Cancelling an
    /// already cancelled instance overwrites the end date.
    #[instrument(skip(self))]
    pub async fn cancel_instance(
        &self,
        id: i64,
        cancellation_date: NaiveDate,
    ) -> Result<Instance, BillingError> {
        let instance = self
            .db
            .write("cancel_instance", move |document| {
                let instance = document.instances.get_mut(&id).ok_or_else(|| {
                    BillingError::NotFound(anyhow::anyhow!("Instance {} not found", id))
                })?;
                if cancellation_date < instance.start_date {
                    return Err(BillingError::ValidationError(anyhow::anyhow!(
                        "Instance {} cannot end on {} before it starts on {}",
                        id,
                        cancellation_date,
                        instance.start_date
                    )));
                }
                if !instance.is_active() {
                    warn!(instance_id = id, "Instance already cancelled, overwriting end date");
                }
                instance.cancel(cancellation_date);
                Ok(instance.clone())
            })
            .await?;

        record_operation("instance", "cancelled");
        info!(instance_id = id, end_date = %cancellation_date, "Instance cancelled");
        Ok(instance)
    }
}

fn upsert_label(outcome: Upsert) -> &'static str {
    match outcome {
        Upsert::Inserted => "created",
        Upsert::Updated => "updated",
    }
}
