//! 配置管理
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//!
//! 1. 内置默认值
//! 2. TOML 配置文件（显式路径，或 `config/orchestra.toml`、`orchestra.toml`、
//!    `/etc/orchestra/config.toml` 中第一个存在的文件）
//! 3. `ORCHESTRA_` 前缀的环境变量，层级用 `__` 分隔，
//!    例如 `ORCHESTRA_PROBE__MAX_ATTEMPTS=5`
//!
//! ```toml
//! [database]
//! max_connections = 10
//!
//! [clusters.lps]
//! url = "postgres://orchestra@db.lps/orchestra"
//! storage_path = "/mnt/shared/storage/lps"
//!
//! [probe]
//! max_attempts = 3
//! backoff_seconds = 300
//!
//! [lifecycle]
//! multi_step_mode = "transactional"
//! ```

pub mod models;

pub use models::*;
