use serde::{Deserialize, Serialize};

/// 单个物理集群的存储端点与产物根目录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// 存储端点，`postgres://` / `postgresql://` 为PostgreSQL，其余按SQLite处理
    pub url: String,
    /// 执行器写入任务产物的根目录
    pub storage_path: String,
}

impl ClusterConfig {
    pub fn new(url: impl Into<String>, storage_path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            storage_path: storage_path.into(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            return Err(anyhow::anyhow!("集群存储URL不能为空"));
        }

        if self.storage_path.is_empty() {
            return Err(anyhow::anyhow!("集群存储路径不能为空"));
        }

        Ok(())
    }
}
