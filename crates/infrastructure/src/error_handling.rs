//! Repository error handling with operation context
//!
//! Every repository call builds a [`StoreOperationContext`] describing what it
//! was doing; when the store fails the helpers here turn the raw `sqlx::Error`
//! into an [`OrchestraError`] whose kind the lifecycle layer can inspect, and
//! log it with the entity it concerned.

use std::fmt;

use chrono::{DateTime, Utc};
use orchestra_core::OrchestraError;
use sqlx::Error as SqlxError;
use tracing::{error, info, instrument};

/// Operation context for repository operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryOperation {
    Create,
    Read,
    Update,
    Delete,
    Query,
    BatchUpdate,
    BatchDelete,
    Probe,
    Migrate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryOperation::Create => write!(f, "创建"),
            RepositoryOperation::Read => write!(f, "查询"),
            RepositoryOperation::Update => write!(f, "更新"),
            RepositoryOperation::Delete => write!(f, "删除"),
            RepositoryOperation::Query => write!(f, "查询"),
            RepositoryOperation::BatchUpdate => write!(f, "批量更新"),
            RepositoryOperation::BatchDelete => write!(f, "批量删除"),
            RepositoryOperation::Probe => write!(f, "探测"),
            RepositoryOperation::Migrate => write!(f, "迁移"),
        }
    }
}

/// 持久化实体种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Worker,
    Task,
    Job,
    Node,
    Dataset,
    Schema,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Worker => write!(f, "用户"),
            EntityKind::Task => write!(f, "任务"),
            EntityKind::Job => write!(f, "作业"),
            EntityKind::Node => write!(f, "节点"),
            EntityKind::Dataset => write!(f, "数据集"),
            EntityKind::Schema => write!(f, "数据库结构"),
        }
    }
}

/// Context information for a single repository operation
#[derive(Debug, Clone)]
pub struct StoreOperationContext {
    pub operation: RepositoryOperation,
    pub entity: EntityKind,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub additional_info: Option<String>,
}

impl StoreOperationContext {
    pub fn new(operation: RepositoryOperation, entity: EntityKind) -> Self {
        Self {
            operation,
            entity,
            entity_id: None,
            entity_name: None,
            timestamp: Utc::now(),
            additional_info: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.entity_name = Some(name);
        self
    }

    pub fn with_additional_info(mut self, info: String) -> Self {
        self.additional_info = Some(info);
        self
    }

    pub fn entity_description(&self) -> String {
        match (&self.entity_id, &self.entity_name) {
            (Some(id), Some(name)) => format!("{} '{}' (ID: {})", self.entity, name, id),
            (Some(id), None) => format!("{} (ID: {})", self.entity, id),
            (None, Some(name)) => format!("{} '{}'", self.entity, name),
            (None, None) => self.entity.to_string(),
        }
    }
}

/// Enhanced error helpers for repository operations
pub struct RepositoryErrorHelpers;

impl RepositoryErrorHelpers {
    /// 把 sqlx 错误转换为带上下文的编排错误
    ///
    /// 唯一约束与外键冲突映射为 `Integrity`；连接池关闭、超时与I/O错误保留
    /// 原始 `sqlx::Error`，其失败类别为 `StoreUnavailable`。
    #[instrument(skip_all, fields(
        operation = %context.operation,
        entity = %context.entity,
        entity_id = ?context.entity_id,
        entity_name = ?context.entity_name,
        timestamp = %context.timestamp,
    ))]
    pub fn database_error(context: StoreOperationContext, error: SqlxError) -> OrchestraError {
        let entity_desc = context.entity_description();
        let operation_desc = context.operation.to_string();

        match &error {
            SqlxError::Database(db_error) => {
                if db_error.is_unique_violation() {
                    let msg = format!(
                        "{}{}时发生唯一约束冲突: {}",
                        operation_desc,
                        entity_desc,
                        db_error.constraint().unwrap_or("unique")
                    );
                    error!(error = %error, "{}", msg);
                    return OrchestraError::integrity(msg);
                }
                if db_error.is_foreign_key_violation() {
                    let msg = format!(
                        "{}{}时发生外键约束冲突: {}",
                        operation_desc,
                        entity_desc,
                        db_error.constraint().unwrap_or("foreign key")
                    );
                    error!(error = %error, "{}", msg);
                    return OrchestraError::integrity(msg);
                }
                error!(error = %error, "{}{}时发生数据库错误", operation_desc, entity_desc);
            }
            SqlxError::PoolClosed => {
                error!("{}{}时数据库连接池已关闭", operation_desc, entity_desc);
            }
            SqlxError::PoolTimedOut => {
                error!("{}{}时数据库连接池超时", operation_desc, entity_desc);
            }
            SqlxError::Io(io_error) => {
                error!(error = %io_error, "{}{}时发生I/O错误", operation_desc, entity_desc);
            }
            _ => {
                error!(error = %error, "{}{}时发生未知数据库错误", operation_desc, entity_desc);
            }
        }

        OrchestraError::Database(error)
    }

    /// 按上下文中的实体种类构造"未找到"错误
    pub fn not_found(context: StoreOperationContext) -> OrchestraError {
        let entity_desc = context.entity_description();
        error!("{}{}时未找到: {} 不存在", context.operation, entity_desc, entity_desc);

        let name = context
            .entity_name
            .clone()
            .or_else(|| context.entity_id.map(|id| id.to_string()))
            .unwrap_or_default();
        match context.entity {
            EntityKind::Task => OrchestraError::TaskNotFound { name },
            EntityKind::Job => OrchestraError::JobNotFound {
                id: context.entity_id.unwrap_or(0),
            },
            EntityKind::Worker => OrchestraError::WorkerNotFound { username: name },
            EntityKind::Node => OrchestraError::NodeNotFound { name },
            EntityKind::Dataset => OrchestraError::DatasetNotFound {
                username: name,
                dataset: context.additional_info.unwrap_or_default(),
            },
            EntityKind::Schema => OrchestraError::Internal(format!("{entity_desc} 不存在")),
        }
    }

    /// Log successful repository operation
    pub fn log_operation_success(
        context: StoreOperationContext,
        entity_desc: &str,
        additional_info: Option<&str>,
    ) {
        let base_msg = format!("{}{}成功", context.operation, entity_desc);

        if let Some(info) = additional_info {
            info!("{}: {}", base_msg, info);
        } else {
            info!("{}", base_msg);
        }
    }
}

/// Macro for creating repository operation context easily
#[macro_export]
macro_rules! store_context {
    ($entity:ident, $operation:ident) => {
        $crate::error_handling::StoreOperationContext::new(
            $crate::error_handling::RepositoryOperation::$operation,
            $crate::error_handling::EntityKind::$entity,
        )
    };
    ($entity:ident, $operation:ident, id = $id:expr) => {
        $crate::store_context!($entity, $operation).with_id($id)
    };
    ($entity:ident, $operation:ident, name = $name:expr) => {
        $crate::store_context!($entity, $operation).with_name($name.to_string())
    };
    ($entity:ident, $operation:ident, id = $id:expr, name = $name:expr) => {
        $crate::store_context!($entity, $operation)
            .with_id($id)
            .with_name($name.to_string())
    };
}
