use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Settings every binary reads: a `configuration` file (optional) layered
/// under `APP__*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn load_falls_back_to_defaults() {
        std::env::remove_var("APP__LOG_LEVEL");
        std::env::remove_var("APP__OTLP_ENDPOINT");

        let config = Config::load().expect("config should load");
        assert_eq!(config.log_level, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn environment_overrides_log_level() {
        std::env::set_var("APP__LOG_LEVEL", "debug");
        let config = Config::load().expect("config should load");
        std::env::remove_var("APP__LOG_LEVEL");

        assert_eq!(config.log_level, "debug");
    }
}
