//! 粗粒度结果：把 `OrchestraResult` 折叠为 `Option` / `bool`，失败时记录日志

use orchestra_core::{FailureKind, OrchestraResult};
use tracing::{error, warn};

pub trait Coarse<T> {
    /// 成功时 `Some`，失败时记录日志并返回 `None`
    fn or_none(self, operation: &str) -> Option<T>;

    /// 成功时 `true`，失败时记录日志并返回 `false`
    fn succeeded(self, operation: &str) -> bool;
}

impl<T> Coarse<T> for OrchestraResult<T> {
    fn or_none(self, operation: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                match e.kind() {
                    FailureKind::NotFound | FailureKind::InvalidInput => {
                        warn!(operation, error = %e, "操作未完成")
                    }
                    kind => error!(operation, ?kind, error = %e, "操作失败"),
                }
                None
            }
        }
    }

    fn succeeded(self, operation: &str) -> bool {
        self.or_none(operation).is_some()
    }
}
