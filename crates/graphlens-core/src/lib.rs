pub mod app_config;
pub mod config;
pub mod insight;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ModelConfig};
pub use config::{load_app_config, load_app_config_from_env, load_model_config};
pub use insight::{normalize_metric_name, DataPoint, HistoricalDataPoint, InsightRecord};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
