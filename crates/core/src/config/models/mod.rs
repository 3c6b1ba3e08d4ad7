pub mod app_config;
pub mod cluster;
pub mod database;
pub mod lifecycle;
pub mod logging;
pub mod probe;

pub use app_config::AppConfig;
pub use cluster::ClusterConfig;
pub use database::DatabaseConfig;
pub use lifecycle::{LifecycleConfig, MultiStepMode};
pub use logging::LoggingConfig;
pub use probe::{ProbeConfig, DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_BACKOFF_SECONDS};
