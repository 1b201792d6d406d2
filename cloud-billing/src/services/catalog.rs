//! Resource, category and configuration management.

use crate::error::BillingError;
use crate::models::{
    AllocatedResource, CatalogImport, Category, Configuration, ConfigurationResource,
    CreateCategory, CreateConfiguration, CreateResource, Document, ImportSummary, Resource,
    SetConfigurationResource, Upsert,
};
use crate::services::database::Database;
use crate::services::metrics::record_operation;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use validator::Validate;

fn upsert_label(outcome: Upsert) -> &'static str {
    match outcome {
        Upsert::Inserted => "created",
        Upsert::Updated => "updated",
    }
}

/// Catalog records: priced resources, categories and configurations with
/// their resource allocations.
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Add a new resource. Fails with `DuplicateKey` when the id is taken.
    #[instrument(skip(self, input), fields(resource_id = input.id))]
    pub async fn create_resource(&self, input: CreateResource) -> Result<Resource, BillingError> {
        input.validate()?;
        let resource = self
            .db
            .write("create_resource", move |document| {
                if document.resources.contains(&input.id) {
                    return Err(BillingError::DuplicateKey(anyhow::anyhow!(
                        "Resource {} already exists",
                        input.id
                    )));
                }
                let resource = Resource::from(input);
                document.resources.push(resource.clone());
                Ok(resource)
            })
            .await?;

        record_operation("resource", "created");
        info!(name = %resource.name, "Resource created");
        Ok(resource)
    }

    /// Insert or replace a resource by id.
    #[instrument(skip(self, input), fields(resource_id = input.id))]
    pub async fn upsert_resource(&self, input: CreateResource) -> Result<Resource, BillingError> {
        input.validate()?;
        let (resource, outcome) = self
            .db
            .write("upsert_resource", move |document| {
                let resource = Resource::from(input);
                let outcome = document.resources.upsert(resource.clone());
                Ok((resource, outcome))
            })
            .await?;

        record_operation("resource", upsert_label(outcome));
        Ok(resource)
    }

    pub async fn get_resource(&self, id: i64) -> Result<Option<Resource>, BillingError> {
        let document = self.db.read("get_resource").await?;
        Ok(document.resources.get(&id).cloned())
    }

    pub async fn list_resources(&self) -> Result<Vec<Resource>, BillingError> {
        Ok(self.db.read("list_resources").await?.resources.to_vec())
    }

    // =========================================================================
    // Category Operations
    // =========================================================================

    #[instrument(skip(self, input), fields(category_id = input.id))]
    pub async fn create_category(&self, input: CreateCategory) -> Result<Category, BillingError> {
        input.validate()?;
        let category = self
            .db
            .write("create_category", move |document| {
                if document.categories.contains(&input.id) {
                    return Err(BillingError::DuplicateKey(anyhow::anyhow!(
                        "Category {} already exists",
                        input.id
                    )));
                }
                let category = Category::from(input);
                document.categories.push(category.clone());
                Ok(category)
            })
            .await?;

        record_operation("category", "created");
        info!(name = %category.name, "Category created");
        Ok(category)
    }

    #[instrument(skip(self, input), fields(category_id = input.id))]
    pub async fn upsert_category(&self, input: CreateCategory) -> Result<Category, BillingError> {
        input.validate()?;
        let (category, outcome) = self
            .db
            .write("upsert_category", move |document| {
                let category = Category::from(input);
                let outcome = document.categories.upsert(category.clone());
                Ok((category, outcome))
            })
            .await?;

        record_operation("category", upsert_label(outcome));
        Ok(category)
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, BillingError> {
        let document = self.db.read("get_category").await?;
        Ok(document.categories.get(&id).cloned())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, BillingError> {
        Ok(self.db.read("list_categories").await?.categories.to_vec())
    }

    // =========================================================================
    // Configuration Operations
    // =========================================================================

    /// Add a configuration under an existing category.
    #[instrument(skip(self, input), fields(configuration_id = input.id, category_id = input.category_id))]
    pub async fn create_configuration(
        &self,
        input: CreateConfiguration,
    ) -> Result<Configuration, BillingError> {
        input.validate()?;
        let configuration = self
            .db
            .write("create_configuration", move |document| {
                if document.configurations.contains(&input.id) {
                    return Err(BillingError::DuplicateKey(anyhow::anyhow!(
                        "Configuration {} already exists",
                        input.id
                    )));
                }
                apply_configuration(document, input).map(|(configuration, _)| configuration)
            })
            .await?;

        record_operation("configuration", "created");
        info!(name = %configuration.name, "Configuration created");
        Ok(configuration)
    }

    /// Insert or replace a configuration. Existing allocations are kept.
    #[instrument(skip(self, input), fields(configuration_id = input.id, category_id = input.category_id))]
    pub async fn upsert_configuration(
        &self,
        input: CreateConfiguration,
    ) -> Result<Configuration, BillingError> {
        input.validate()?;
        let (configuration, outcome) = self
            .db
            .write("upsert_configuration", move |document| {
                apply_configuration(document, input)
            })
            .await?;

        record_operation("configuration", upsert_label(outcome));
        Ok(configuration)
    }

    pub async fn get_configuration(&self, id: i64) -> Result<Option<Configuration>, BillingError> {
        let document = self.db.read("get_configuration").await?;
        Ok(document.configurations.get(&id).cloned())
    }

    pub async fn list_configurations(&self) -> Result<Vec<Configuration>, BillingError> {
        Ok(self
            .db
            .read("list_configurations")
            .await?
            .configurations
            .to_vec())
    }

    /// Set how many units of a resource a configuration includes. Replaces
    /// the quantity when the pair already exists.
    #[instrument(skip(self, input), fields(configuration_id = input.configuration_id, resource_id = input.resource_id))]
    pub async fn set_configuration_resource(
        &self,
        input: SetConfigurationResource,
    ) -> Result<ConfigurationResource, BillingError> {
        let allocation = self
            .db
            .write("set_configuration_resource", move |document| {
                apply_allocation(document, input)
            })
            .await?;

        record_operation("configuration_resource", "set");
        info!(quantity = %allocation.quantity, "Configuration resource set");
        Ok(allocation)
    }

    /// Allocations of one configuration, in insertion order.
    pub async fn list_configuration_resources(
        &self,
        configuration_id: i64,
    ) -> Result<Vec<ConfigurationResource>, BillingError> {
        let document = self.db.read("list_configuration_resources").await?;
        let configuration = document
            .configurations
            .get(&configuration_id)
            .ok_or_else(|| {
                BillingError::NotFound(anyhow::anyhow!(
                    "Configuration {} not found",
                    configuration_id
                ))
            })?;
        Ok(configuration.resources.clone())
    }

    /// Allocations of one configuration joined with the resource catalog.
    /// Allocations whose resource no longer exists are left out.
    pub async fn allocated_resources(
        &self,
        configuration_id: i64,
    ) -> Result<Vec<AllocatedResource>, BillingError> {
        let document = self.db.read("allocated_resources").await?;
        let configuration = document
            .configurations
            .get(&configuration_id)
            .ok_or_else(|| {
                BillingError::NotFound(anyhow::anyhow!(
                    "Configuration {} not found",
                    configuration_id
                ))
            })?;

        Ok(configuration
            .resources
            .iter()
            .filter_map(|allocation| {
                document
                    .resources
                    .get(&allocation.resource_id)
                    .map(|resource| AllocatedResource {
                        resource_id: resource.id,
                        resource_name: resource.name.clone(),
                        quantity: allocation.quantity,
                        hourly_rate: resource.hourly_rate,
                    })
            })
            .collect())
    }

    // =========================================================================
    // Bulk Import
    // =========================================================================

    /// Apply a configuration message in one write. Records are upserted in
    /// dependency order; if any record is rejected nothing is saved.
    #[instrument(skip(self, import))]
    pub async fn import_catalog(&self, import: CatalogImport) -> Result<ImportSummary, BillingError> {
        for resource in &import.resources {
            resource.validate()?;
        }
        for category in &import.categories {
            category.validate()?;
        }
        for configuration in &import.configurations {
            configuration.validate()?;
        }
        for client in &import.clients {
            client.validate()?;
        }

        let summary = self
            .db
            .write("import_catalog", move |document| {
                let mut summary = ImportSummary::default();

                for input in import.resources {
                    document.resources.upsert(Resource::from(input));
                    summary.resources += 1;
                }
                for input in import.categories {
                    document.categories.upsert(Category::from(input));
                    summary.categories += 1;
                }
                for input in import.configurations {
                    apply_configuration(document, input)?;
                    summary.configurations += 1;
                }
                for input in import.allocations {
                    apply_allocation(document, input)?;
                    summary.allocations += 1;
                }
                for input in import.clients {
                    document.clients.upsert(input.into_client()?);
                    summary.clients += 1;
                }
                for input in import.instances {
                    let instance = input.into_instance()?;
                    super::accounts::check_instance_references(document, &instance)?;
                    document.instances.upsert(instance);
                    summary.instances += 1;
                }

                Ok(summary)
            })
            .await?;

        record_operation("catalog", "imported");
        info!(
            resources = summary.resources,
            categories = summary.categories,
            configurations = summary.configurations,
            allocations = summary.allocations,
            clients = summary.clients,
            instances = summary.instances,
            "Catalog imported"
        );
        Ok(summary)
    }
}

/// Upsert a configuration after checking its category, keeping allocations
/// already recorded for the same id.
fn apply_configuration(
    document: &mut Document,
    input: CreateConfiguration,
) -> Result<(Configuration, Upsert), BillingError> {
    if !document.categories.contains(&input.category_id) {
        return Err(BillingError::ReferenceError(anyhow::anyhow!(
            "Configuration {} references unknown category {}",
            input.id,
            input.category_id
        )));
    }

    let resources = document
        .configurations
        .get(&input.id)
        .map(|existing| existing.resources.clone())
        .unwrap_or_default();
    let configuration = Configuration {
        id: input.id,
        name: input.name,
        description: input.description,
        category_id: input.category_id,
        resources,
    };
    let outcome = document.configurations.upsert(configuration.clone());
    Ok((configuration, outcome))
}

fn apply_allocation(
    document: &mut Document,
    input: SetConfigurationResource,
) -> Result<ConfigurationResource, BillingError> {
    if input.quantity < Decimal::ZERO {
        return Err(BillingError::ValidationError(anyhow::anyhow!(
            "Quantity must not be negative, got {}",
            input.quantity
        )));
    }
    if !document.resources.contains(&input.resource_id) {
        return Err(BillingError::ReferenceError(anyhow::anyhow!(
            "Allocation references unknown resource {}",
            input.resource_id
        )));
    }
    let configuration = document
        .configurations
        .get_mut(&input.configuration_id)
        .ok_or_else(|| {
            BillingError::ReferenceError(anyhow::anyhow!(
                "Allocation references unknown configuration {}",
                input.configuration_id
            ))
        })?;
    Ok(configuration.set_resource(input.resource_id, input.quantity))
}
