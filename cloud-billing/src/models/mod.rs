//! Domain models for cloud-billing.

mod billing_run;
mod catalog;
mod client;
mod consumption;
mod document;
mod instance;
mod invoice;
mod report;

pub use billing_run::{BillingPeriod, BillingRun};
pub use catalog::{
    AllocatedResource, Category, Configuration, ConfigurationResource, CreateCategory,
    CreateConfiguration, CreateResource, Resource, ResourceKind, SetConfigurationResource,
};
pub use client::{Client, CreateClient, TaxId};
pub use consumption::{
    BilledIdentity, ConsumptionEvent, ConsumptionIdentity, DeduplicationReport, RecordConsumption,
};
pub use document::{Collection, Document, Keyed, Upsert};
pub use instance::{CreateInstance, Instance, InstanceState};
pub use invoice::{Invoice, LineItem};
pub use report::{CatalogImport, ImportSummary, RevenueLine, RevenueReport};
