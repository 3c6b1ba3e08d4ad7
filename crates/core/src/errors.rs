
use thiserror::Error;

/// 编排存储层错误类型定义
#[derive(Debug, Error)]
pub enum OrchestraError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("存储不可用: 连续{attempts}次探测失败")]
    StoreUnavailable { attempts: u32 },

    #[error("任务未找到: {name}")]
    TaskNotFound { name: String },

    #[error("作业未找到: {id}")]
    JobNotFound { id: i64 },

    #[error("用户未找到: {username}")]
    WorkerNotFound { username: String },

    #[error("节点未找到: {name}")]
    NodeNotFound { name: String },

    #[error("数据集未找到: {username}/{dataset}")]
    DatasetNotFound { username: String, dataset: String },

    #[error("数据完整性冲突: {0}")]
    Integrity(String),

    #[error("非法状态迁移: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("未配置的集群: {0}")]
    UnknownCluster(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type OrchestraResult<T> = Result<T, OrchestraError>;

/// 失败类别，调用方据此区分"不存在"、"存储不可达"与"完整性冲突"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    StoreUnavailable,
    Integrity,
    InvalidInput,
    Configuration,
    Internal,
}

impl OrchestraError {
    pub fn task_not_found<S: Into<String>>(name: S) -> Self {
        Self::TaskNotFound { name: name.into() }
    }
    pub fn worker_not_found<S: Into<String>>(username: S) -> Self {
        Self::WorkerNotFound {
            username: username.into(),
        }
    }
    pub fn job_not_found(id: i64) -> Self {
        Self::JobNotFound { id }
    }
    pub fn integrity<S: Into<String>>(msg: S) -> Self {
        Self::Integrity(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// 错误所属的失败类别
    pub fn kind(&self) -> FailureKind {
        match self {
            OrchestraError::TaskNotFound { .. }
            | OrchestraError::JobNotFound { .. }
            | OrchestraError::WorkerNotFound { .. }
            | OrchestraError::NodeNotFound { .. }
            | OrchestraError::DatasetNotFound { .. } => FailureKind::NotFound,
            OrchestraError::StoreUnavailable { .. } => FailureKind::StoreUnavailable,
            OrchestraError::Database(e) => sqlx_failure_kind(e),
            OrchestraError::DatabaseOperation(_) => FailureKind::Internal,
            OrchestraError::Integrity(_) => FailureKind::Integrity,
            OrchestraError::InvalidTransition { .. } | OrchestraError::ValidationError(_) => {
                FailureKind::InvalidInput
            }
            OrchestraError::Configuration(_) | OrchestraError::UnknownCluster(_) => {
                FailureKind::Configuration
            }
            OrchestraError::Serialization(_) | OrchestraError::Internal(_) => FailureKind::Internal,
        }
    }

    /// 致命错误：配置缺失等无法在进程内恢复的故障
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OrchestraError::Configuration(_)
                | OrchestraError::UnknownCluster(_)
                | OrchestraError::Internal(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::StoreUnavailable
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FailureKind::NotFound
    }
}

fn sqlx_failure_kind(error: &sqlx::Error) -> FailureKind {
    match error {
        sqlx::Error::RowNotFound => FailureKind::NotFound,
        sqlx::Error::PoolClosed
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => FailureKind::StoreUnavailable,
        sqlx::Error::Database(db) if db.constraint().is_some() => FailureKind::Integrity,
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            FailureKind::Integrity
        }
        sqlx::Error::Configuration(_) => FailureKind::Configuration,
        _ => FailureKind::Internal,
    }
}

impl From<serde_json::Error> for OrchestraError {
    fn from(err: serde_json::Error) -> Self {
        OrchestraError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for OrchestraError {
    fn from(err: anyhow::Error) -> Self {
        OrchestraError::Internal(err.to_string())
    }
}
