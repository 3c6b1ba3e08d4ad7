//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则。生命周期管理器和查询门面
//! 只依赖这里的 trait，具体的 PostgreSQL / SQLite 实现位于基础设施层。

use std::sync::Arc;

use async_trait::async_trait;
use orchestra_core::OrchestraResult;

use crate::entities::{Dataset, Job, Node, Task, Worker};
use crate::value_objects::Status;

/// 用户仓储抽象
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    async fn create(&self, worker: &Worker) -> OrchestraResult<Worker>;
    async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Worker>>;
    async fn get_by_username(&self, username: &str) -> OrchestraResult<Option<Worker>>;
    async fn list(&self) -> OrchestraResult<Vec<Worker>>;
    async fn update_max_priority(&self, id: i64, max_priority: i32) -> OrchestraResult<()>;
}

/// 任务仓储抽象
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> OrchestraResult<Task>;
    async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Task>>;
    async fn get_by_name(&self, task_name: &str) -> OrchestraResult<Option<Task>>;
    /// 按创建顺序（id 升序）返回用户的全部任务
    async fn list_by_owner(&self, owner_id: i64) -> OrchestraResult<Vec<Task>>;
    async fn update_status(&self, id: i64, status: Status) -> OrchestraResult<()>;
    /// 只删除任务行；作业需先行删除
    async fn delete(&self, id: i64) -> OrchestraResult<bool>;
    /// 在单个事务内删除任务的全部作业和任务本身，返回删除的作业数
    async fn delete_with_jobs(&self, id: i64) -> OrchestraResult<u64>;
}

/// 作业仓储抽象
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> OrchestraResult<Job>;
    async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Job>>;
    async fn list_by_task(&self, task_id: i64) -> OrchestraResult<Vec<Job>>;
    async fn update_status(&self, id: i64, status: Status) -> OrchestraResult<()>;
    /// `retry` 加一并返回新值
    async fn increment_retry(&self, id: i64) -> OrchestraResult<i32>;
    async fn delete_by_task(&self, task_id: i64) -> OrchestraResult<u64>;
    /// 在单个事务内把任务下所有 `failed` 作业改为 `assigned`，返回受影响的作业数
    async fn requeue_failed(&self, task_id: i64) -> OrchestraResult<u64>;
}

/// 计算节点仓储抽象
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn create(&self, node: &Node) -> OrchestraResult<Node>;
    async fn get_by_name(&self, name: &str) -> OrchestraResult<Option<Node>>;
    async fn list(&self) -> OrchestraResult<Vec<Node>>;
    async fn set_enabled(&self, name: &str, enabled: bool) -> OrchestraResult<bool>;
}

/// 数据集仓储抽象
#[async_trait]
pub trait DatasetRepository: Send + Sync {
    async fn create(&self, dataset: &Dataset) -> OrchestraResult<Dataset>;
    async fn get(&self, username: &str, dataset: &str) -> OrchestraResult<Option<Dataset>>;
    async fn list_by_username(&self, username: &str) -> OrchestraResult<Vec<Dataset>>;
}

/// 一个编排进程持有的存储会话：存活探测 + 仓储工厂
///
/// 会话不在并发调用方之间共享；每个编排进程各自持有一个。
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// 有界重试的存活探测，所有读写操作之前调用
    async fn is_connected(&self) -> bool;
    /// 单次探测的最大尝试次数，用于构造 `StoreUnavailable`
    fn probe_attempts(&self) -> u32;
    fn worker_repository(&self) -> Arc<dyn WorkerRepository>;
    fn task_repository(&self) -> Arc<dyn TaskRepository>;
    fn job_repository(&self) -> Arc<dyn JobRepository>;
    fn node_repository(&self) -> Arc<dyn NodeRepository>;
    fn dataset_repository(&self) -> Arc<dyn DatasetRepository>;
}
