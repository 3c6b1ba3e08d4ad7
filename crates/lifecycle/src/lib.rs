//! 任务与作业的生命周期协调
//!
//! 三个入口都只依赖 [`StoreSession`] 端口：
//! - [`TaskLifecycleManager`]：创建、重试、删除与状态迁移
//! - [`QueryFacade`]：只读查询，存储故障折叠为空结果
//! - [`ResourceRegistry`]：用户与计算节点登记
//!
//! 每个操作之前都先做存活探测，探测失败直接返回 `StoreUnavailable`，不触碰任何仓储。

pub mod coarse;
pub mod manager;
pub mod queries;
pub mod registry;

pub use coarse::Coarse;
pub use manager::TaskLifecycleManager;
pub use queries::QueryFacade;
pub use registry::ResourceRegistry;

use orchestra_core::{OrchestraError, OrchestraResult};
use orchestra_domain::repositories::StoreSession;
use tracing::warn;

/// 存活探测闸门
pub(crate) async fn ensure_connected(session: &dyn StoreSession) -> OrchestraResult<()> {
    if session.is_connected().await {
        return Ok(());
    }

    let attempts = session.probe_attempts();
    warn!(attempts, "存储不可达，操作被跳过");
    Err(OrchestraError::StoreUnavailable { attempts })
}
