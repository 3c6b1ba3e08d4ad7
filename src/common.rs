use std::path::Path;

use anyhow::{Context, Result};
use orchestra_core::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统
///
/// `RUST_LOG` 优先于传入的级别。
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 加载并校验应用配置
///
/// 未给出路径时按默认位置查找配置文件，找不到则只使用内置默认值与环境变量。
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    if let Some(path) = config_path {
        if !Path::new(path).exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {path}"));
        }
    }

    let config = AppConfig::load(config_path)
        .with_context(|| format!("加载配置文件失败: {}", config_path.unwrap_or("<默认位置>")))?;
    config.validate().context("配置校验失败")?;

    Ok(config)
}

/// 屏蔽存储URL中的口令
pub fn mask_database_url(url: &str) -> String {
    let scheme_end = url.find("://").map(|pos| pos + 3).unwrap_or(0);
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':') {
            let mut masked = url.to_string();
            masked.replace_range(scheme_end + colon_pos + 1..at_pos, "***");
            return masked;
        }
    }
    url.to_string()
}
