//! Catalog, account and import integration tests for cloud-billing.

mod common;

use cloud_billing::error::BillingError;
use cloud_billing::models::{
    CatalogImport, CreateCategory, CreateConfiguration, InstanceState, SetConfigurationResource,
};
use common::{date, TestApp, SMALL_VM_CONFIGURATION_ID, TEST_TAX_ID};
use rust_decimal_macros::dec;

fn import_payload() -> CatalogImport {
    serde_json::from_value(serde_json::json!({
        "resources": [
            { "id": 1, "name": "vCPU", "abbreviation": "cpu", "unit_of_measure": "core",
              "kind": "hardware", "hourly_rate": "0.04" },
            { "id": 2, "name": "OS licence", "abbreviation": "os", "unit_of_measure": "seat",
              "kind": "software", "hourly_rate": "0.01" }
        ],
        "categories": [
            { "id": 1, "name": "Compute", "workload": "web" }
        ],
        "configurations": [
            { "id": 10, "name": "Small VM", "category_id": 1 }
        ],
        "allocations": [
            { "configuration_id": 10, "resource_id": 1, "quantity": "2" },
            { "configuration_id": 10, "resource_id": 2, "quantity": "1" }
        ],
        "clients": [
            { "tax_id": "1234-5", "name": "Acme", "username": "acme", "secret": "x",
              "email": "ops@acme.test" }
        ],
        "instances": [
            { "id": 100, "client_tax_id": "1234-5", "configuration_id": 10, "name": "web-1",
              "start_date": "2025-01-01" }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn create_configuration_with_unknown_category_fails() {
    let test = TestApp::in_memory();
    let err = test
        .app
        .catalog
        .create_configuration(CreateConfiguration {
            id: 1,
            name: "Orphan".to_string(),
            description: String::new(),
            category_id: 404,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::ReferenceError(_)));
}

#[tokio::test]
async fn create_instance_with_unknown_references_fails() {
    let test = TestApp::in_memory();
    test.seed_catalog().await;

    let err = test
        .app
        .accounts
        .create_instance(TestApp::instance(1, "5555-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::ReferenceError(_)));

    let mut input = TestApp::instance(1, TEST_TAX_ID);
    input.configuration_id = 999;
    let err = test.app.accounts.create_instance(input).await.unwrap_err();
    assert!(matches!(err, BillingError::ReferenceError(_)));
}

#[tokio::test]
async fn duplicate_instance_id_is_rejected() {
    let test = TestApp::in_memory();
    test.seed_with_instance(100).await;

    let err = test
        .app
        .accounts
        .create_instance(TestApp::instance(100, TEST_TAX_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::DuplicateKey(_)));
}

#[tokio::test]
async fn instance_with_end_date_must_be_cancelled() {
    let test = TestApp::in_memory();
    test.seed_catalog().await;

    let mut input = TestApp::instance(1, TEST_TAX_ID);
    input.end_date = Some(date(2025, 2, 1));
    let err = test.app.accounts.create_instance(input).await.unwrap_err();
    assert!(matches!(err, BillingError::ValidationError(_)));

    let mut input = TestApp::instance(1, TEST_TAX_ID);
    input.state = InstanceState::Cancelled;
    input.end_date = Some(date(2025, 2, 1));
    let instance = test.app.accounts.create_instance(input).await.unwrap();
    assert!(!instance.is_active());
}

#[tokio::test]
async fn upsert_twice_keeps_one_record_with_latest_values() {
    let test = TestApp::in_memory();
    let catalog = &test.app.catalog;

    catalog
        .upsert_category(CreateCategory {
            id: 3,
            name: "Storage".to_string(),
            description: "v1".to_string(),
            workload: "archive".to_string(),
        })
        .await
        .unwrap();
    catalog
        .upsert_category(CreateCategory {
            id: 3,
            name: "Block Storage".to_string(),
            description: "v2".to_string(),
            workload: "database".to_string(),
        })
        .await
        .unwrap();

    let categories = catalog.list_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Block Storage");
    assert_eq!(categories[0].workload, "database");
}

#[tokio::test]
async fn allocation_quantity_is_replaced_not_duplicated() {
    let test = TestApp::in_memory();
    test.seed_catalog().await;

    test.app
        .catalog
        .set_configuration_resource(SetConfigurationResource {
            configuration_id: SMALL_VM_CONFIGURATION_ID,
            resource_id: 1,
            quantity: dec!(4),
        })
        .await
        .unwrap();

    let allocations = test
        .app
        .catalog
        .list_configuration_resources(SMALL_VM_CONFIGURATION_ID)
        .await
        .unwrap();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].quantity, dec!(4));
}

#[tokio::test]
async fn import_applies_every_collection() {
    let test = TestApp::in_memory();
    let summary = test.app.catalog.import_catalog(import_payload()).await.unwrap();

    assert_eq!(summary.resources, 2);
    assert_eq!(summary.allocations, 2);
    assert_eq!(summary.instances, 1);

    let allocated = test.app.catalog.allocated_resources(10).await.unwrap();
    assert_eq!(allocated.len(), 2);
    assert_eq!(allocated[1].resource_name, "OS licence");

    let instance = test.app.accounts.get_instance(100).await.unwrap().unwrap();
    assert_eq!(instance.state, InstanceState::Active);
}

#[tokio::test]
async fn import_is_idempotent() {
    let test = TestApp::in_memory();
    test.app.catalog.import_catalog(import_payload()).await.unwrap();
    test.app.catalog.import_catalog(import_payload()).await.unwrap();

    let snapshot = test.app.db.snapshot().await.unwrap();
    assert_eq!(snapshot.resources.len(), 2);
    assert_eq!(snapshot.configurations.len(), 1);
    assert_eq!(snapshot.clients.len(), 1);
    assert_eq!(snapshot.instances.len(), 1);
}

#[tokio::test]
async fn rejected_import_writes_nothing() {
    let test = TestApp::in_memory();
    let mut payload = import_payload();
    payload.instances[0].configuration_id = 77;

    let err = test.app.catalog.import_catalog(payload).await.unwrap_err();
    assert!(matches!(err, BillingError::ReferenceError(_)));

    let snapshot = test.app.db.snapshot().await.unwrap();
    assert!(snapshot.resources.is_empty());
    assert!(snapshot.clients.is_empty());
}
