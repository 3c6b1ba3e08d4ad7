use std::fmt;
use std::str::FromStr;

use orchestra_core::{OrchestraError, OrchestraResult};
use serde::{Deserialize, Serialize};

/// 物理集群标识，每个集群对应一个固定的存储端点和产物目录
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cluster {
    #[serde(rename = "LPS")]
    Lps,
    #[serde(rename = "SDUMONT")]
    Sdumont,
}

impl Cluster {
    /// 持久化时使用的取值
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Lps => "LPS",
            Cluster::Sdumont => "SDUMONT",
        }
    }

    /// 配置文件 `[clusters.<key>]` 中的键
    pub fn config_key(&self) -> &'static str {
        match self {
            Cluster::Lps => "lps",
            Cluster::Sdumont => "sdumont",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = OrchestraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LPS" => Ok(Cluster::Lps),
            "SDUMONT" => Ok(Cluster::Sdumont),
            _ => Err(OrchestraError::UnknownCluster(s.to_string())),
        }
    }
}

/// 任务与作业共用的状态机
///
/// ```text
/// registered -> assigned -> succeeded
///                   |  ^
///                   v  | (retry)
///                 failed
/// ```
///
/// `succeeded` 之后没有任何迁移。超出重试预算后的处理由外部执行器决定。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Registered,
    Assigned,
    Succeeded,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Registered => "registered",
            Status::Assigned => "assigned",
            Status::Succeeded => "succeeded",
            Status::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Succeeded)
    }

    /// 是否允许从当前状态迁移到 `next`；相同状态视为幂等的空操作
    pub fn can_transition_to(&self, next: Status) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Status::Registered, Status::Assigned)
                | (Status::Assigned, Status::Succeeded)
                | (Status::Assigned, Status::Failed)
                | (Status::Failed, Status::Assigned)
        )
    }

    pub fn transition(&self, next: Status) -> OrchestraResult<Status> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrchestraError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = OrchestraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Status::Registered),
            "assigned" => Ok(Status::Assigned),
            "succeeded" => Ok(Status::Succeeded),
            "failed" => Ok(Status::Failed),
            _ => Err(OrchestraError::Serialization(format!("无效的状态: {s}"))),
        }
    }
}
