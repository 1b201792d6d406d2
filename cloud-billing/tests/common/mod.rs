//! Test helper module for cloud-billing integration tests.
//!
//! Provides an application over an in-memory or temporary-file document and
//! helpers that seed a minimal priced catalog.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use cloud_billing::models::{
    CreateCategory, CreateClient, CreateConfiguration, CreateInstance, CreateResource,
    InstanceState, RecordConsumption, ResourceKind, SetConfigurationResource,
};
use cloud_billing::services::{init_metrics, FileDocumentStore, MemoryDocumentStore};
use cloud_billing::startup::Application;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_TAX_ID: &str = "1234-5";
pub const OTHER_TAX_ID: &str = "7654-K";
pub const CPU_RESOURCE_ID: i64 = 1;
pub const RAM_RESOURCE_ID: i64 = 2;
pub const COMPUTE_CATEGORY_ID: i64 = 1;
pub const SMALL_VM_CONFIGURATION_ID: i64 = 10;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub app: Application,
    pub document_path: Option<PathBuf>,
    _dir: Option<TempDir>,
}

impl TestApp {
    /// Application over an in-memory document.
    pub fn in_memory() -> Self {
        init_metrics();
        Self {
            app: Application::with_store(Arc::new(MemoryDocumentStore::new())),
            document_path: None,
            _dir: None,
        }
    }

    /// Application over a JSON document in a fresh temporary directory.
    pub fn on_disk() -> Self {
        init_metrics();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("billing.json");
        Self {
            app: Application::with_store(Arc::new(FileDocumentStore::new(&path))),
            document_path: Some(path),
            _dir: Some(dir),
        }
    }

    /// A second application over the same file, as a restarted process would see it.
    pub fn reopen(&self) -> Application {
        let path = self
            .document_path
            .as_ref()
            .expect("reopen requires an on-disk app");
        Application::with_store(Arc::new(FileDocumentStore::new(path)))
    }

    pub fn resource(id: i64, name: &str, rate: Decimal) -> CreateResource {
        CreateResource {
            id,
            name: name.to_string(),
            abbreviation: name.to_lowercase(),
            unit_of_measure: "unit".to_string(),
            kind: ResourceKind::Hardware,
            hourly_rate: rate,
        }
    }

    pub fn client(tax_id: &str) -> CreateClient {
        CreateClient {
            tax_id: tax_id.to_string(),
            name: format!("Client {tax_id}"),
            username: format!("user-{tax_id}"),
            secret: "changeme".to_string(),
            address: "1 Main St".to_string(),
            email: "billing@client.test".to_string(),
        }
    }

    pub fn instance(id: i64, tax_id: &str) -> CreateInstance {
        CreateInstance {
            id,
            client_tax_id: tax_id.to_string(),
            configuration_id: SMALL_VM_CONFIGURATION_ID,
            name: format!("vm-{id}"),
            start_date: date(2025, 1, 1),
            state: InstanceState::Active,
            end_date: None,
        }
    }

    pub fn usage(
        instance_id: i64,
        tax_id: &str,
        hours: Decimal,
        timestamp: NaiveDateTime,
    ) -> RecordConsumption {
        RecordConsumption {
            instance_id,
            client_tax_id: tax_id.to_string(),
            hours,
            timestamp,
        }
    }

    /// One CPU resource at 10/hour, allocated twice to the small VM
    /// configuration, and one client.
    pub async fn seed_catalog(&self) {
        let catalog = &self.app.catalog;
        catalog
            .create_resource(Self::resource(CPU_RESOURCE_ID, "vCPU", dec!(10)))
            .await
            .expect("Failed to create resource");
        catalog
            .create_category(CreateCategory {
                id: COMPUTE_CATEGORY_ID,
                name: "Compute".to_string(),
                description: "General purpose compute".to_string(),
                workload: "web".to_string(),
            })
            .await
            .expect("Failed to create category");
        catalog
            .create_configuration(CreateConfiguration {
                id: SMALL_VM_CONFIGURATION_ID,
                name: "Small VM".to_string(),
                description: "2 vCPU".to_string(),
                category_id: COMPUTE_CATEGORY_ID,
            })
            .await
            .expect("Failed to create configuration");
        catalog
            .set_configuration_resource(SetConfigurationResource {
                configuration_id: SMALL_VM_CONFIGURATION_ID,
                resource_id: CPU_RESOURCE_ID,
                quantity: dec!(2),
            })
            .await
            .expect("Failed to allocate resource");
        self.app
            .accounts
            .create_client(Self::client(TEST_TAX_ID))
            .await
            .expect("Failed to create client");
    }

    /// Catalog plus one active instance `id` owned by the test client.
    pub async fn seed_with_instance(&self, id: i64) {
        self.seed_catalog().await;
        self.app
            .accounts
            .create_instance(Self::instance(id, TEST_TAX_ID))
            .await
            .expect("Failed to create instance");
    }
}
