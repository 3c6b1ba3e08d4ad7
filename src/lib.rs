//! # Orchestra
//!
//! 多集群批处理作业编排的持久化与生命周期协调层。
//!
//! ```no_run
//! use orchestra::{common, Orchestra};
//! use orchestra_domain::value_objects::Cluster;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = common::load_config(Some("config/orchestra.toml"))?;
//! common::init_logging(&config.logging.level, &config.logging.format)?;
//!
//! let session = Orchestra::open(&config, Cluster::Lps).await?;
//! let retried = session.lifecycle().retry_task("T1").await?;
//! println!("requeued {retried} jobs");
//! session.finalize().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod common;

pub use app::Orchestra;
pub use orchestra_core::{config::AppConfig, FailureKind, OrchestraError, OrchestraResult};
pub use orchestra_lifecycle::Coarse;
