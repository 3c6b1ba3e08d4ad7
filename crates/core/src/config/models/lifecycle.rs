use serde::{Deserialize, Serialize};

/// 多步操作（删除任务、重试任务）的提交方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiStepMode {
    /// 单事务提交，任一步失败整体回滚
    #[default]
    Transactional,
    /// 逐步提交，失败时已完成的步骤不回滚（兼容旧行为）
    Sequential,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub multi_step_mode: MultiStepMode,
    /// 创建作业时是否校验 priority <= 所属用户的 max_priority
    #[serde(default)]
    pub enforce_max_priority: bool,
}
