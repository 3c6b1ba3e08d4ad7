use std::sync::Arc;

use orchestra_core::{OrchestraError, OrchestraResult};
use orchestra_domain::{
    entities::{Node, Worker},
    repositories::StoreSession,
};
use tracing::{info, instrument};

use crate::ensure_connected;

/// 用户与计算节点登记
pub struct ResourceRegistry {
    session: Arc<dyn StoreSession>,
}

impl ResourceRegistry {
    pub fn new(session: Arc<dyn StoreSession>) -> Self {
        Self { session }
    }

    #[instrument(skip(self, password_hash))]
    pub async fn register_worker(
        &self,
        username: &str,
        max_priority: i32,
        password_hash: &str,
    ) -> OrchestraResult<Worker> {
        ensure_connected(self.session.as_ref()).await?;
        if username.trim().is_empty() {
            return Err(OrchestraError::validation_error("用户名不能为空"));
        }

        self.session
            .worker_repository()
            .create(&Worker::new(username, max_priority, password_hash))
            .await
    }

    /// 调整用户的作业优先级上限
    #[instrument(skip(self))]
    pub async fn set_max_priority(&self, username: &str, max_priority: i32) -> OrchestraResult<Worker> {
        ensure_connected(self.session.as_ref()).await?;
        let workers = self.session.worker_repository();

        let mut worker = workers
            .get_by_username(username)
            .await?
            .ok_or_else(|| OrchestraError::worker_not_found(username))?;
        workers.update_max_priority(worker.id, max_priority).await?;
        worker.max_priority = max_priority;
        Ok(worker)
    }

    #[instrument(skip(self, node), fields(node_name = %node.name, cluster = %node.cluster))]
    pub async fn register_node(&self, node: Node) -> OrchestraResult<Node> {
        ensure_connected(self.session.as_ref()).await?;
        if node.name.trim().is_empty() {
            return Err(OrchestraError::validation_error("节点名不能为空"));
        }
        if node.cpu_slots < 0 || node.gpu_slots < 0 {
            return Err(OrchestraError::validation_error("节点槽位数不能为负"));
        }

        let created = self.session.node_repository().create(&node).await?;
        info!(node_id = created.id, "计算节点已登记");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn set_node_enabled(&self, name: &str, enabled: bool) -> OrchestraResult<()> {
        ensure_connected(self.session.as_ref()).await?;
        if self.session.node_repository().set_enabled(name, enabled).await? {
            Ok(())
        } else {
            Err(OrchestraError::NodeNotFound {
                name: name.to_string(),
            })
        }
    }
}
