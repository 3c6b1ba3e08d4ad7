//! 存活探测
//!
//! 每次读写之前先做一次廉价的读探测；失败时按固定退避时间重试，
//! 用尽次数后才判定存储不可用。退避期间调用方被整体阻塞。

use std::time::Duration;

use async_trait::async_trait;
use orchestra_core::{config::ProbeConfig, OrchestraError, OrchestraResult};
use tracing::{debug, info, warn};

/// 有界重试策略：最多 `max_attempts` 次，两次之间等待 `backoff`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// 不等待的策略，测试与单次检查使用
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for RetryPolicy {
    fn from(config: &ProbeConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }
}

/// 可被探测的存储目标
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> OrchestraResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct LivenessProbe {
    policy: RetryPolicy,
}

impl LivenessProbe {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 探测目标，成功时返回所用的尝试次数
    ///
    /// 第一次成功立即返回；否则在每两次尝试之间休眠 `backoff`，
    /// 全部失败后返回 `StoreUnavailable`。
    pub async fn probe<H: HealthCheck + ?Sized>(&self, target: &H) -> OrchestraResult<u32> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match target.health_check().await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(attempt, "数据库连接已恢复");
                    } else {
                        debug!("数据库连接正常");
                    }
                    return Ok(attempt);
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "数据库连接失败，{}秒后重试",
                        self.policy.backoff.as_secs()
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "数据库连接失败，已用尽全部探测次数"
                    );
                }
            }
        }

        Err(OrchestraError::StoreUnavailable {
            attempts: max_attempts,
        })
    }

    pub async fn is_alive<H: HealthCheck + ?Sized>(&self, target: &H) -> bool {
        self.probe(target).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// 前 `failures` 次探测失败，之后成功
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthCheck for FlakyStore {
        async fn health_check(&self) -> OrchestraResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(OrchestraError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_returns_immediately() {
        let probe = LivenessProbe::new(RetryPolicy::new(3, Duration::from_secs(300)));
        let store = FlakyStore::new(0);

        let started = Instant::now();
        assert_eq!(probe.probe(&store).await.unwrap(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let probe = LivenessProbe::new(RetryPolicy::new(3, Duration::from_secs(300)));
        let store = FlakyStore::new(2);

        let started = Instant::now();
        assert_eq!(probe.probe(&store).await.unwrap(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_exact_attempt_budget() {
        let probe = LivenessProbe::new(RetryPolicy::new(4, Duration::from_secs(300)));
        let store = FlakyStore::new(u32::MAX);

        let started = Instant::now();
        let err = probe.probe(&store).await.unwrap_err();

        assert!(matches!(err, OrchestraError::StoreUnavailable { attempts: 4 }));
        assert_eq!(store.calls(), 4);
        // 只在两次尝试之间等待
        assert_eq!(started.elapsed(), Duration::from_secs(3 * 300));
        assert!(!probe.is_alive(&store).await);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&ProbeConfig {
            max_attempts: 5,
            backoff_seconds: 12,
        });
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(12));
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }
}
