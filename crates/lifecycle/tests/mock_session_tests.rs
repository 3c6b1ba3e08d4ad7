use std::sync::Arc;

use async_trait::async_trait;
use mockall::{mock, predicate::eq, Sequence};
use orchestra_core::{
    config::{LifecycleConfig, MultiStepMode},
    OrchestraError, OrchestraResult,
};
use orchestra_domain::{
    entities::{Dataset, Job, JobSpec, Node, Task, TaskSpec, Worker},
    repositories::{
        DatasetRepository, JobRepository, NodeRepository, StoreSession, TaskRepository,
        WorkerRepository,
    },
    value_objects::{Cluster, Status},
};
use orchestra_lifecycle::{QueryFacade, ResourceRegistry, TaskLifecycleManager};

mock! {
    pub Session {}

    #[async_trait]
    impl StoreSession for Session {
        async fn is_connected(&self) -> bool;
        fn probe_attempts(&self) -> u32;
        fn worker_repository(&self) -> Arc<dyn WorkerRepository>;
        fn task_repository(&self) -> Arc<dyn TaskRepository>;
        fn job_repository(&self) -> Arc<dyn JobRepository>;
        fn node_repository(&self) -> Arc<dyn NodeRepository>;
        fn dataset_repository(&self) -> Arc<dyn DatasetRepository>;
    }
}

mock! {
    pub Tasks {}

    #[async_trait]
    impl TaskRepository for Tasks {
        async fn create(&self, task: &Task) -> OrchestraResult<Task>;
        async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Task>>;
        async fn get_by_name(&self, task_name: &str) -> OrchestraResult<Option<Task>>;
        async fn list_by_owner(&self, owner_id: i64) -> OrchestraResult<Vec<Task>>;
        async fn update_status(&self, id: i64, status: Status) -> OrchestraResult<()>;
        async fn delete(&self, id: i64) -> OrchestraResult<bool>;
        async fn delete_with_jobs(&self, id: i64) -> OrchestraResult<u64>;
    }
}

mock! {
    pub Jobs {}

    #[async_trait]
    impl JobRepository for Jobs {
        async fn create(&self, job: &Job) -> OrchestraResult<Job>;
        async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Job>>;
        async fn list_by_task(&self, task_id: i64) -> OrchestraResult<Vec<Job>>;
        async fn update_status(&self, id: i64, status: Status) -> OrchestraResult<()>;
        async fn increment_retry(&self, id: i64) -> OrchestraResult<i32>;
        async fn delete_by_task(&self, task_id: i64) -> OrchestraResult<u64>;
        async fn requeue_failed(&self, task_id: i64) -> OrchestraResult<u64>;
    }
}

fn alice() -> Worker {
    Worker {
        id: 1,
        ..Worker::new("alice", 1000, "")
    }
}

fn stored_task() -> Task {
    Task {
        id: 10,
        ..Task::from_spec(
            &alice(),
            TaskSpec::new("T1", "/cfg", "/in", "/out", "img:1", Cluster::Lps),
        )
    }
}

fn failed_job(id: i64) -> Job {
    Job {
        id,
        status: Status::Failed,
        ..Job::from_spec(&stored_task(), JobSpec::new("/cfg/j.json", id as i32))
    }
}

/// 探测失败的会话：任何仓储工厂都不允许被调用
fn unreachable_session() -> MockSession {
    let mut session = MockSession::new();
    session.expect_is_connected().returning(|| false);
    session.expect_probe_attempts().return_const(3u32);
    session.expect_worker_repository().never();
    session.expect_task_repository().never();
    session.expect_job_repository().never();
    session.expect_node_repository().never();
    session.expect_dataset_repository().never();
    session
}

fn reachable_session(tasks: MockTasks, jobs: MockJobs) -> MockSession {
    let tasks: Arc<dyn TaskRepository> = Arc::new(tasks);
    let jobs: Arc<dyn JobRepository> = Arc::new(jobs);

    let mut session = MockSession::new();
    session.expect_is_connected().returning(|| true);
    session.expect_probe_attempts().return_const(3u32);
    session
        .expect_task_repository()
        .returning(move || Arc::clone(&tasks));
    session
        .expect_job_repository()
        .returning(move || Arc::clone(&jobs));
    session
}

fn tasks_with_t1() -> MockTasks {
    let mut tasks = MockTasks::new();
    tasks
        .expect_get_by_name()
        .with(eq("T1"))
        .returning(|_| Ok(Some(stored_task())));
    tasks
}

fn manager(session: MockSession, mode: MultiStepMode) -> TaskLifecycleManager {
    TaskLifecycleManager::new(
        Arc::new(session),
        LifecycleConfig {
            multi_step_mode: mode,
            ..LifecycleConfig::default()
        },
    )
}

#[tokio::test]
async fn test_probe_failure_short_circuits_manager() {
    let manager = manager(unreachable_session(), MultiStepMode::Transactional);
    let task = stored_task();

    let err = manager
        .create_task(&alice(), TaskSpec::new("T2", "/c", "/i", "/o", "img", Cluster::Lps))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestraError::StoreUnavailable { attempts: 3 }));

    assert!(manager
        .create_job(&task, JobSpec::new("/cfg/j.json", 0))
        .await
        .is_err());
    assert!(manager.retry_task("T1").await.is_err());
    assert!(manager.delete_task("T1").await.is_err());
    assert!(manager.transition_task("T1", Status::Assigned).await.is_err());
    assert!(manager.transition_job(1, Status::Assigned).await.is_err());
    assert!(manager.record_job_attempt(1).await.is_err());
}

#[tokio::test]
async fn test_probe_failure_short_circuits_queries_and_registry() {
    let session: Arc<dyn StoreSession> = Arc::new(unreachable_session());
    let queries = QueryFacade::new(session.clone());
    let registry = ResourceRegistry::new(session);

    assert!(queries.get_user("alice").await.is_none());
    assert!(queries.get_task("T1").await.is_none());
    assert!(queries.get_all_users().await.is_empty());
    assert!(queries.get_all_tasks(&alice(), Some(Cluster::Lps)).await.is_empty());
    assert!(queries.get_all_jobs(&stored_task()).await.is_empty());
    assert!(queries.get_all_machines().await.is_empty());
    assert!(queries.get_machine("n1").await.is_none());
    assert!(queries.get_all_datasets("alice").await.is_empty());
    assert!(queries.get_dataset("alice", "zee").await.is_none());
    assert!(queries
        .create_dataset(&Dataset::new("alice", "zee", Cluster::Lps, "/d"))
        .await
        .is_none());

    assert!(registry.register_worker("bob", 1, "").await.is_err());
    assert!(registry.set_max_priority("bob", 1).await.is_err());
    assert!(registry
        .register_node(Node::new("n1", Cluster::Lps, 1, 0))
        .await
        .is_err());
    assert!(registry.set_node_enabled("n1", false).await.is_err());
}

#[tokio::test]
async fn test_transactional_retry_uses_single_statement() {
    let mut jobs = MockJobs::new();
    jobs.expect_requeue_failed()
        .with(eq(10))
        .times(1)
        .returning(|_| Ok(2));
    jobs.expect_list_by_task().never();
    jobs.expect_update_status().never();

    let manager = manager(
        reachable_session(tasks_with_t1(), jobs),
        MultiStepMode::Transactional,
    );
    assert_eq!(manager.retry_task("T1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_sequential_retry_keeps_partial_progress() {
    let mut seq = Sequence::new();
    let mut jobs = MockJobs::new();
    jobs.expect_requeue_failed().never();
    jobs.expect_list_by_task()
        .with(eq(10))
        .returning(|_| Ok(vec![failed_job(1), failed_job(2), failed_job(3)]));
    jobs.expect_update_status()
        .with(eq(1), eq(Status::Assigned))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    jobs.expect_update_status()
        .with(eq(2), eq(Status::Assigned))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(OrchestraError::DatabaseOperation("connection reset".into())));

    let manager = manager(
        reachable_session(tasks_with_t1(), jobs),
        MultiStepMode::Sequential,
    );
    // 第三个作业不会被处理，第一个保持 assigned
    assert!(manager.retry_task("T1").await.is_err());
}

#[tokio::test]
async fn test_sequential_delete_aborts_before_task_step() {
    let mut tasks = tasks_with_t1();
    tasks.expect_delete().never();
    tasks.expect_delete_with_jobs().never();

    let mut jobs = MockJobs::new();
    jobs.expect_delete_by_task()
        .with(eq(10))
        .times(1)
        .returning(|_| Err(OrchestraError::DatabaseOperation("disk full".into())));

    let manager = manager(reachable_session(tasks, jobs), MultiStepMode::Sequential);
    assert!(manager.delete_task("T1").await.is_err());
}

#[tokio::test]
async fn test_transactional_delete_uses_single_transaction() {
    let mut tasks = tasks_with_t1();
    tasks.expect_delete().never();
    tasks.expect_delete_with_jobs()
        .with(eq(10))
        .times(1)
        .returning(|_| Ok(3));

    let mut jobs = MockJobs::new();
    jobs.expect_delete_by_task().never();

    let manager = manager(reachable_session(tasks, jobs), MultiStepMode::Transactional);
    assert_eq!(manager.delete_task("T1").await.unwrap(), 3);
}
