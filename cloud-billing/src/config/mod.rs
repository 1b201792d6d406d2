//! Configuration module for cloud-billing.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub store: StoreConfig,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl BillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let path = env::var("BILLING_DOCUMENT_PATH").unwrap_or_else(|_| "billing.json".to_string());
        if path.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "BILLING_DOCUMENT_PATH must not be empty"
            )));
        }

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "cloud-billing".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            store: StoreConfig {
                path: PathBuf::from(path),
            },
        })
    }

    /// Point the store at an explicit path, e.g. from a command-line flag.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_when_env_is_unset() {
        env::remove_var("BILLING_DOCUMENT_PATH");
        env::remove_var("SERVICE_NAME");

        let config = BillingConfig::from_env().unwrap();
        assert_eq!(config.service_name, "cloud-billing");
        assert_eq!(config.store.path, PathBuf::from("billing.json"));
    }

    #[test]
    #[serial]
    fn document_path_comes_from_env() {
        env::set_var("BILLING_DOCUMENT_PATH", "/var/lib/billing/doc.json");
        let config = BillingConfig::from_env().unwrap();
        env::remove_var("BILLING_DOCUMENT_PATH");

        assert_eq!(config.store.path, PathBuf::from("/var/lib/billing/doc.json"));
    }

    #[test]
    #[serial]
    fn empty_document_path_is_rejected() {
        env::set_var("BILLING_DOCUMENT_PATH", "  ");
        let result = BillingConfig::from_env();
        env::remove_var("BILLING_DOCUMENT_PATH");

        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
