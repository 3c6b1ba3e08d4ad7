use std::sync::Arc;

use orchestra_core::{
    config::{LifecycleConfig, MultiStepMode},
    OrchestraError, OrchestraResult,
};
use orchestra_domain::{
    entities::{Job, JobSpec, Task, TaskSpec, Worker},
    repositories::StoreSession,
    value_objects::Status,
};
use tracing::{debug, info, instrument, warn};

use crate::ensure_connected;

/// 任务生命周期管理器
///
/// 状态机：`registered -> assigned -> {succeeded, failed}`，`failed -> assigned`（重试）。
/// 删除与重试按 [`MultiStepMode`] 选择单事务或逐步提交。
pub struct TaskLifecycleManager {
    session: Arc<dyn StoreSession>,
    config: LifecycleConfig,
}

impl TaskLifecycleManager {
    pub fn new(session: Arc<dyn StoreSession>, config: LifecycleConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    async fn find_task(&self, task_name: &str) -> OrchestraResult<Task> {
        self.session
            .task_repository()
            .get_by_name(task_name)
            .await?
            .ok_or_else(|| OrchestraError::task_not_found(task_name))
    }

    async fn find_job(&self, job_id: i64) -> OrchestraResult<Job> {
        self.session
            .job_repository()
            .get_by_id(job_id)
            .await?
            .ok_or_else(|| OrchestraError::job_not_found(job_id))
    }

    /// 以 `registered` 状态创建任务
    #[instrument(skip(self, owner, spec), fields(owner = %owner.username, task_name = %spec.task_name))]
    pub async fn create_task(&self, owner: &Worker, spec: TaskSpec) -> OrchestraResult<Task> {
        ensure_connected(self.session.as_ref()).await?;
        spec.validate()?;

        let task = Task::from_spec(owner, spec);
        let created = self.session.task_repository().create(&task).await?;
        info!(task_id = created.id, cluster = %created.cluster, "任务已登记");
        Ok(created)
    }

    /// 以 `registered` 状态创建作业，镜像与集群继承自任务
    #[instrument(skip(self, task, spec), fields(task_name = %task.task_name, config_id = spec.config_id))]
    pub async fn create_job(&self, task: &Task, spec: JobSpec) -> OrchestraResult<Job> {
        ensure_connected(self.session.as_ref()).await?;

        if self.config.enforce_max_priority {
            let owner = self
                .session
                .worker_repository()
                .get_by_id(task.owner_id)
                .await?
                .ok_or_else(|| OrchestraError::worker_not_found(task.owner_id.to_string()))?;
            if !owner.allows_priority(spec.priority) {
                return Err(OrchestraError::integrity(format!(
                    "作业优先级 {} 超过用户 '{}' 的上限 {}",
                    spec.priority, owner.username, owner.max_priority
                )));
            }
        }

        let job = Job::from_spec(task, spec);
        let created = self.session.job_repository().create(&job).await?;
        debug!(job_id = created.id, priority = created.priority, "作业已登记");
        Ok(created)
    }

    /// 把任务下所有 `failed` 作业改回 `assigned`，不增加 `retry`
    ///
    /// 返回被重新分配的作业数；重复调用时为 0。
    #[instrument(skip(self))]
    pub async fn retry_task(&self, task_name: &str) -> OrchestraResult<u64> {
        ensure_connected(self.session.as_ref()).await?;
        let task = self.find_task(task_name).await?;
        let jobs = self.session.job_repository();

        let requeued = match self.config.multi_step_mode {
            MultiStepMode::Transactional => jobs.requeue_failed(task.id).await?,
            MultiStepMode::Sequential => {
                let mut requeued = 0;
                for job in jobs.list_by_task(task.id).await? {
                    if job.status != Status::Failed {
                        continue;
                    }
                    // 中途失败时已更新的作业保持 assigned
                    jobs.update_status(job.id, job.status.transition(Status::Assigned)?)
                        .await?;
                    requeued += 1;
                }
                requeued
            }
        };

        info!(task_id = task.id, requeued, "失败作业已重新分配");
        Ok(requeued)
    }

    /// 先删作业再删任务，返回删除的作业数
    #[instrument(skip(self))]
    pub async fn delete_task(&self, task_name: &str) -> OrchestraResult<u64> {
        ensure_connected(self.session.as_ref()).await?;
        let task = self.find_task(task_name).await?;
        let tasks = self.session.task_repository();

        let removed_jobs = match self.config.multi_step_mode {
            MultiStepMode::Transactional => tasks.delete_with_jobs(task.id).await?,
            MultiStepMode::Sequential => {
                let removed = self.session.job_repository().delete_by_task(task.id).await?;
                if !tasks.delete(task.id).await? {
                    warn!(task_id = task.id, removed, "作业已删除，但任务行不存在");
                    return Err(OrchestraError::task_not_found(task_name));
                }
                removed
            }
        };

        info!(task_id = task.id, removed_jobs, "任务已删除");
        Ok(removed_jobs)
    }

    /// 按状态机迁移任务状态；相同状态为空操作
    #[instrument(skip(self), fields(status = %status))]
    pub async fn transition_task(&self, task_name: &str, status: Status) -> OrchestraResult<Task> {
        ensure_connected(self.session.as_ref()).await?;
        let mut task = self.find_task(task_name).await?;

        let next = task.status.transition(status)?;
        if next != task.status {
            self.session.task_repository().update_status(task.id, next).await?;
            info!(task_id = task.id, from = %task.status, to = %next, "任务状态已更新");
            task.status = next;
        }
        Ok(task)
    }

    /// 按状态机迁移作业状态；相同状态为空操作
    #[instrument(skip(self), fields(status = %status))]
    pub async fn transition_job(&self, job_id: i64, status: Status) -> OrchestraResult<Job> {
        ensure_connected(self.session.as_ref()).await?;
        let mut job = self.find_job(job_id).await?;

        let next = job.status.transition(status)?;
        if next != job.status {
            self.session.job_repository().update_status(job.id, next).await?;
            debug!(from = %job.status, to = %next, "作业状态已更新");
            job.status = next;
        }
        Ok(job)
    }

    /// 记录一次执行尝试，`retry` 只增不减
    #[instrument(skip(self))]
    pub async fn record_job_attempt(&self, job_id: i64) -> OrchestraResult<i32> {
        ensure_connected(self.session.as_ref()).await?;
        self.session.job_repository().increment_retry(job_id).await
    }
}
