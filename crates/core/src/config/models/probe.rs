use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 探测次数上限 (NUMBER_OF_TRIALS)
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;

/// 两次探测之间的退避时间：5分钟
pub const DEFAULT_PROBE_BACKOFF_SECONDS: u64 = 5 * 60;

/// 存活探测的重试策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    pub backoff_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PROBE_ATTEMPTS,
            backoff_seconds: DEFAULT_PROBE_BACKOFF_SECONDS,
        }
    }
}

impl ProbeConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_seconds)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            return Err(anyhow::anyhow!("探测次数必须大于0"));
        }
        Ok(())
    }
}
