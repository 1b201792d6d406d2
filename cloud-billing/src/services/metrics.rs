//! Metrics module for cloud-billing.
//! Provides Prometheus metrics for store access, metering and invoicing.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_counter, register_histogram_vec, register_int_counter,
    register_int_counter_vec, Counter, Encoder, HistogramVec, IntCounter, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;

/// Document store operation duration histogram
pub static STORE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "cloud_billing_store_operation_duration_seconds",
            "Duration of load/mutate/save cycles against the document store"
        ),
        &["operation"]
    )
    .expect("Failed to register STORE_OPERATION_DURATION")
});

/// Catalog and account writes by entity and outcome
pub static RECORD_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Consumption events appended
pub static CONSUMPTION_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Duplicate consumption events removed
pub static DUPLICATES_REMOVED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Invoices generated by billing runs
pub static INVOICES_GENERATED_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Line items skipped because a configuration or resource was missing
pub static LINE_ITEMS_SKIPPED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billed amount (monetary tracking)
pub static BILLED_AMOUNT_TOTAL: OnceLock<Counter> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once.
pub fn init_metrics() {
    RECORD_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "cloud_billing_record_operations_total",
                "Catalog and account writes by entity and operation"
            ),
            &["entity", "operation"]
        )
        .expect("Failed to register RECORD_OPERATIONS_TOTAL")
    });

    CONSUMPTION_EVENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "cloud_billing_consumption_events_total",
                "Consumption events appended by source"
            ),
            &["source"]
        )
        .expect("Failed to register CONSUMPTION_EVENTS_TOTAL")
    });

    DUPLICATES_REMOVED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "cloud_billing_duplicate_consumption_removed_total",
                "Duplicate consumption events removed by deduplication"
            ),
            &["collection"]
        )
        .expect("Failed to register DUPLICATES_REMOVED_TOTAL")
    });

    INVOICES_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter!(opts!(
            "cloud_billing_invoices_generated_total",
            "Invoices generated by billing runs"
        ))
        .expect("Failed to register INVOICES_GENERATED_TOTAL")
    });

    LINE_ITEMS_SKIPPED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "cloud_billing_line_items_skipped_total",
                "Line items skipped during billing by missing reference"
            ),
            &["reason"]
        )
        .expect("Failed to register LINE_ITEMS_SKIPPED_TOTAL")
    });

    BILLED_AMOUNT_TOTAL.get_or_init(|| {
        register_counter!(opts!(
            "cloud_billing_billed_amount_total",
            "Total amount invoiced"
        ))
        .expect("Failed to register BILLED_AMOUNT_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "cloud_billing_errors_total",
                "Total errors by type for alerting"
            ),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*STORE_OPERATION_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a catalog or account write.
pub fn record_operation(entity: &str, operation: &str) {
    if let Some(counter) = RECORD_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[entity, operation]).inc();
    }
}

/// Record appended consumption events.
pub fn record_consumption_ingested(source: &str, count: usize) {
    if let Some(counter) = CONSUMPTION_EVENTS_TOTAL.get() {
        counter.with_label_values(&[source]).inc_by(count as u64);
    }
}

/// Record removed duplicates.
pub fn record_duplicates_removed(count: usize) {
    if let Some(counter) = DUPLICATES_REMOVED_TOTAL.get() {
        counter.with_label_values(&["consumptions"]).inc_by(count as u64);
    }
}

/// Record a generated invoice and its amount.
pub fn record_invoice_generated(amount: f64) {
    if let Some(counter) = INVOICES_GENERATED_TOTAL.get() {
        counter.inc();
    }
    if let Some(counter) = BILLED_AMOUNT_TOTAL.get() {
        counter.inc_by(amount.abs());
    }
}

/// Record a skipped line item.
pub fn record_line_item_skipped(reason: &str) {
    if let Some(counter) = LINE_ITEMS_SKIPPED_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
