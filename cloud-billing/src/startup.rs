//! Application wiring: one shared database handle behind every service.

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::services::{
    AccountService, BillingEngine, CatalogService, ConsumptionService, Database, DocumentStore,
    ReportService,
};
use std::sync::Arc;
use tracing::info;

/// All services sharing one writer lock.
#[derive(Clone)]
pub struct Application {
    pub db: Database,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub consumption: ConsumptionService,
    pub billing: BillingEngine,
    pub reports: ReportService,
}

impl Application {
    /// Open the configured document, creating it on first use, and make
    /// sure it is readable.
    pub async fn build(config: &BillingConfig) -> Result<Self, BillingError> {
        let app = Self::with_database(Database::open(&config.store.path));
        app.db.initialize().await?;
        app.db.health_check().await?;
        info!(path = %config.store.path.display(), "Billing document ready");
        Ok(app)
    }

    /// Wire services over any store, e.g. an in-memory one in tests.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_database(Database::new(store))
    }

    fn with_database(db: Database) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            accounts: AccountService::new(db.clone()),
            consumption: ConsumptionService::new(db.clone()),
            billing: BillingEngine::new(db.clone()),
            reports: ReportService::new(db.clone()),
            db,
        }
    }
}
