//! Cloud Billing - resource catalog, consumption metering and invoicing over a
//! single persisted document.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod startup;
