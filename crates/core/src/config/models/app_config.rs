use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::{
    cluster::ClusterConfig,
    database::DatabaseConfig,
    lifecycle::LifecycleConfig,
    logging::LoggingConfig,
    probe::{ProbeConfig, DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_BACKOFF_SECONDS},
};

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 集群名（小写，如 `lps`、`sdumont`）到端点的映射
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: ORCHESTRA_, nesting: `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connection_timeout_seconds", 30)?
            .set_default("database.idle_timeout_seconds", 600)?
            .set_default("probe.max_attempts", i64::from(DEFAULT_PROBE_ATTEMPTS))?
            .set_default("probe.backoff_seconds", DEFAULT_PROBE_BACKOFF_SECONDS as i64)?
            .set_default("lifecycle.multi_step_mode", "transactional")?
            .set_default("lifecycle.enforce_max_priority", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/orchestra.toml",
                "orchestra.toml",
                "/etc/orchestra/config.toml",
            ];
            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ORCHESTRA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize::<AppConfig>()
            .context("反序列化配置失败")?
            .normalize_cluster_keys();

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<AppConfig>(toml_str)
            .context("解析TOML配置失败")?
            .normalize_cluster_keys();

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// 按集群名查找端点配置
    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.get(&name.to_ascii_lowercase())
    }

    pub fn with_cluster(mut self, name: &str, cluster: ClusterConfig) -> Self {
        self.clusters.insert(name.to_ascii_lowercase(), cluster);
        self
    }

    // 文件里的 `[clusters.LPS]` 与 `[clusters.lps]` 指向同一集群
    fn normalize_cluster_keys(mut self) -> Self {
        self.clusters = std::mem::take(&mut self.clusters)
            .into_iter()
            .map(|(name, cluster)| (name.to_ascii_lowercase(), cluster))
            .collect();
        self
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置验证失败")?;
        self.probe.validate().context("探测配置验证失败")?;
        self.logging.validate().context("日志配置验证失败")?;

        for (name, cluster) in &self.clusters {
            cluster
                .validate()
                .with_context(|| format!("集群 {name} 配置验证失败"))?;
        }

        Ok(())
    }
}
