use std::future::Future;
use std::sync::Arc;

use orchestra_core::{OrchestraError, OrchestraResult};
use orchestra_domain::{
    entities::{Dataset, Job, Node, Task, Worker},
    repositories::StoreSession,
    value_objects::Cluster,
};
use tracing::instrument;

use crate::{ensure_connected, Coarse};

/// 只读查询门面
///
/// 先做存活探测；探测失败或存储故障时返回 `None` / 空列表，并记录日志。
pub struct QueryFacade {
    session: Arc<dyn StoreSession>,
}

impl QueryFacade {
    pub fn new(session: Arc<dyn StoreSession>) -> Self {
        Self { session }
    }

    async fn gated<T, F>(&self, lookup: F) -> OrchestraResult<T>
    where
        F: Future<Output = OrchestraResult<T>>,
    {
        ensure_connected(self.session.as_ref()).await?;
        lookup.await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, username: &str) -> Option<Worker> {
        self.gated(async {
            self.session
                .worker_repository()
                .get_by_username(username)
                .await?
                .ok_or_else(|| OrchestraError::worker_not_found(username))
        })
        .await
        .or_none("get_user")
    }

    #[instrument(skip(self))]
    pub async fn get_task(&self, task_name: &str) -> Option<Task> {
        self.gated(async {
            self.session
                .task_repository()
                .get_by_name(task_name)
                .await?
                .ok_or_else(|| OrchestraError::task_not_found(task_name))
        })
        .await
        .or_none("get_task")
    }

    #[instrument(skip(self))]
    pub async fn get_all_users(&self) -> Vec<Worker> {
        self.gated(async { self.session.worker_repository().list().await })
            .await
            .or_none("get_all_users")
            .unwrap_or_default()
    }

    /// 用户的全部任务（创建顺序）；给定集群时在内存中过滤
    #[instrument(skip(self, owner), fields(owner = %owner.username))]
    pub async fn get_all_tasks(&self, owner: &Worker, cluster: Option<Cluster>) -> Vec<Task> {
        let tasks = self
            .gated(async {
                self.session
                    .task_repository()
                    .list_by_owner(owner.id)
                    .await
            })
            .await
            .or_none("get_all_tasks")
            .unwrap_or_default();

        match cluster {
            Some(cluster) => tasks.into_iter().filter(|t| t.cluster == cluster).collect(),
            None => tasks,
        }
    }

    #[instrument(skip(self, task), fields(task_name = %task.task_name))]
    pub async fn get_all_jobs(&self, task: &Task) -> Vec<Job> {
        self.gated(async { self.session.job_repository().list_by_task(task.id).await })
            .await
            .or_none("get_all_jobs")
            .unwrap_or_default()
    }

    #[instrument(skip(self))]
    pub async fn get_all_machines(&self) -> Vec<Node> {
        self.gated(async { self.session.node_repository().list().await })
            .await
            .or_none("get_all_machines")
            .unwrap_or_default()
    }

    #[instrument(skip(self))]
    pub async fn get_machine(&self, name: &str) -> Option<Node> {
        self.gated(async {
            self.session
                .node_repository()
                .get_by_name(name)
                .await?
                .ok_or_else(|| OrchestraError::NodeNotFound {
                    name: name.to_string(),
                })
        })
        .await
        .or_none("get_machine")
    }

    #[instrument(skip(self))]
    pub async fn get_all_datasets(&self, username: &str) -> Vec<Dataset> {
        self.gated(async {
            self.session
                .dataset_repository()
                .list_by_username(username)
                .await
        })
        .await
        .or_none("get_all_datasets")
        .unwrap_or_default()
    }

    #[instrument(skip(self))]
    pub async fn get_dataset(&self, username: &str, dataset: &str) -> Option<Dataset> {
        self.gated(async {
            self.session
                .dataset_repository()
                .get(username, dataset)
                .await?
                .ok_or_else(|| OrchestraError::DatasetNotFound {
                    username: username.to_string(),
                    dataset: dataset.to_string(),
                })
        })
        .await
        .or_none("get_dataset")
    }

    /// 登记数据集；(username, dataset) 的唯一性由调用方通过 [`get_dataset`](Self::get_dataset) 检查
    #[instrument(skip(self, dataset), fields(username = %dataset.username, dataset = %dataset.dataset))]
    pub async fn create_dataset(&self, dataset: &Dataset) -> Option<Dataset> {
        self.gated(async { self.session.dataset_repository().create(dataset).await })
            .await
            .or_none("create_dataset")
    }
}
