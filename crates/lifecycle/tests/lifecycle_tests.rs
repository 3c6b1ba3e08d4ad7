use std::sync::Arc;

use anyhow::Result;
use orchestra_core::{
    config::{DatabaseConfig, LifecycleConfig, MultiStepMode},
    FailureKind, OrchestraError,
};
use orchestra_domain::{
    entities::{Dataset, JobSpec, Node, TaskSpec, Worker},
    repositories::StoreSession,
    value_objects::{Cluster, Status},
};
use orchestra_infrastructure::{RetryPolicy, StoreConnector};
use orchestra_lifecycle::{Coarse, QueryFacade, ResourceRegistry, TaskLifecycleManager};

struct Harness {
    connector: Arc<StoreConnector>,
    manager: TaskLifecycleManager,
    queries: QueryFacade,
    registry: ResourceRegistry,
}

async fn harness(config: LifecycleConfig) -> Result<Harness> {
    let connector = StoreConnector::connect_url(
        "sqlite::memory:",
        &DatabaseConfig::default(),
        RetryPolicy::immediate(2),
    )
    .await?;
    connector.initialize().await?;
    let connector = Arc::new(connector);
    let session: Arc<dyn StoreSession> = connector.clone();

    Ok(Harness {
        connector,
        manager: TaskLifecycleManager::new(session.clone(), config),
        queries: QueryFacade::new(session.clone()),
        registry: ResourceRegistry::new(session),
    })
}

fn task_spec(name: &str, cluster: Cluster) -> TaskSpec {
    TaskSpec::new(name, "/cfg/c.json", "/in", "/out", "img:1", cluster)
}

fn sequential() -> LifecycleConfig {
    LifecycleConfig {
        multi_step_mode: MultiStepMode::Sequential,
        ..LifecycleConfig::default()
    }
}

#[tokio::test]
async fn test_create_task_and_job() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let alice = h.registry.register_worker("alice", 1000, "").await?;

    let task = h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;
    let fetched = h.queries.get_task("T1").await.unwrap();
    assert_eq!(fetched.status, Status::Registered);
    assert_eq!(fetched.owner_id, alice.id);
    assert_eq!(fetched.template_exec_args, "{}");
    assert_eq!(fetched.secondary_data_path, "{}");

    let job = h
        .manager
        .create_job(&task, JobSpec::new("/cfg/j0.json", 0))
        .await?;
    assert_eq!(job.container_image, "img:1");
    assert_eq!(job.cluster, Cluster::Lps);
    assert_eq!(job.retry, 0);
    assert_eq!(job.priority, 1000);
    assert_eq!(job.exec_args, "{}");
    assert_eq!(job.status, Status::Registered);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_task_name_is_rejected() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let alice = h.registry.register_worker("alice", 1000, "").await?;

    h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;
    let result = h.manager.create_task(&alice, task_spec("T1", Cluster::Sdumont)).await;
    assert_eq!(result.as_ref().unwrap_err().kind(), FailureKind::Integrity);
    assert!(result.or_none("create_task").is_none());

    let err = h
        .manager
        .create_task(&alice, task_spec("  ", Cluster::Lps))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidInput);
    Ok(())
}

async fn alice_t1_with_jobs(h: &Harness) -> Result<Vec<i64>> {
    let alice = h.registry.register_worker("alice", 1000, "").await?;
    let task = h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;

    let mut ids = Vec::new();
    for (config_id, status) in [Status::Failed, Status::Succeeded, Status::Failed]
        .into_iter()
        .enumerate()
    {
        let job = h
            .manager
            .create_job(&task, JobSpec::new(format!("/cfg/j{config_id}.json"), config_id as i32))
            .await?;
        h.manager.transition_job(job.id, Status::Assigned).await?;
        h.manager.transition_job(job.id, status).await?;
        ids.push(job.id);
    }
    Ok(ids)
}

async fn job_statuses(h: &Harness) -> Vec<Status> {
    let task = h.queries.get_task("T1").await.unwrap();
    h.queries
        .get_all_jobs(&task)
        .await
        .into_iter()
        .map(|j| j.status)
        .collect()
}

#[tokio::test]
async fn test_retry_task_requeues_only_failed_jobs() -> Result<()> {
    for config in [LifecycleConfig::default(), sequential()] {
        let h = harness(config).await?;
        alice_t1_with_jobs(&h).await?;

        assert_eq!(h.manager.retry_task("T1").await?, 2);
        assert_eq!(
            job_statuses(&h).await,
            vec![Status::Assigned, Status::Succeeded, Status::Assigned]
        );

        // 幂等
        assert_eq!(h.manager.retry_task("T1").await?, 0);
        assert!(h
            .queries
            .get_all_jobs(&h.queries.get_task("T1").await.unwrap())
            .await
            .iter()
            .all(|j| j.retry == 0));
    }
    Ok(())
}

#[tokio::test]
async fn test_failed_job_within_priority_ceiling_is_reassigned() -> Result<()> {
    for mode in [MultiStepMode::Transactional, MultiStepMode::Sequential] {
        let h = harness(LifecycleConfig {
            multi_step_mode: mode,
            enforce_max_priority: true,
        })
        .await?;
        let alice = h.registry.register_worker("alice", 10, "").await?;
        let task = h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;

        let job = h
            .manager
            .create_job(&task, JobSpec::new("/cfg/j0.json", 0).with_priority(5))
            .await?;
        assert_eq!(job.priority, 5);
        h.manager.transition_job(job.id, Status::Assigned).await?;
        h.manager.transition_job(job.id, Status::Failed).await?;

        assert_eq!(h.manager.retry_task("T1").await?, 1);
        assert_eq!(job_statuses(&h).await, vec![Status::Assigned]);
    }
    Ok(())
}

#[tokio::test]
async fn test_retry_unknown_task() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let err = h.manager.retry_task("nope").await.unwrap_err();
    assert!(matches!(err, OrchestraError::TaskNotFound { .. }));
    assert!(!h.manager.retry_task("nope").await.succeeded("retry_task"));
    Ok(())
}

#[tokio::test]
async fn test_delete_task_removes_jobs_then_task() -> Result<()> {
    for config in [LifecycleConfig::default(), sequential()] {
        let h = harness(config).await?;
        let alice = h.registry.register_worker("alice", 1000, "").await?;
        h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;
        let task = h.manager.create_task(&alice, task_spec("T2", Cluster::Lps)).await?;
        for config_id in 0..3 {
            h.manager
                .create_job(&task, JobSpec::new("/cfg/j.json", config_id))
                .await?;
        }

        assert_eq!(h.manager.delete_task("T2").await?, 3);
        assert!(h.queries.get_task("T2").await.is_none());
        assert!(h.queries.get_all_jobs(&task).await.is_empty());
        let remaining: Vec<String> = h
            .queries
            .get_all_tasks(&alice, None)
            .await
            .into_iter()
            .map(|t| t.task_name)
            .collect();
        assert_eq!(remaining, vec!["T1".to_string()]);

        let err = h.manager.delete_task("T2").await.unwrap_err();
        assert!(err.is_not_found());
    }
    Ok(())
}

#[tokio::test]
async fn test_status_transitions_follow_state_machine() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let alice = h.registry.register_worker("alice", 1000, "").await?;
    h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;

    let err = h
        .manager
        .transition_task("T1", Status::Succeeded)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestraError::InvalidTransition { .. }));

    h.manager.transition_task("T1", Status::Assigned).await?;
    // 相同状态为空操作
    let task = h.manager.transition_task("T1", Status::Assigned).await?;
    assert_eq!(task.status, Status::Assigned);

    h.manager.transition_task("T1", Status::Succeeded).await?;
    let err = h
        .manager
        .transition_task("T1", Status::Assigned)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidInput);
    assert_eq!(
        h.queries.get_task("T1").await.unwrap().status,
        Status::Succeeded
    );
    Ok(())
}

#[tokio::test]
async fn test_record_job_attempt_is_monotonic() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let ids = alice_t1_with_jobs(&h).await?;

    assert_eq!(h.manager.record_job_attempt(ids[0]).await?, 1);
    assert_eq!(h.manager.record_job_attempt(ids[0]).await?, 2);
    h.manager.retry_task("T1").await?;

    let task = h.queries.get_task("T1").await.unwrap();
    let retries: Vec<i32> = h
        .queries
        .get_all_jobs(&task)
        .await
        .into_iter()
        .map(|j| j.retry)
        .collect();
    assert_eq!(retries, vec![2, 0, 0]);

    let err = h.manager.record_job_attempt(4242).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_priority_ceiling_is_opt_in() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let bob = h.registry.register_worker("bob", 10, "").await?;
    let task = h.manager.create_task(&bob, task_spec("B1", Cluster::Lps)).await?;
    let job = h
        .manager
        .create_job(&task, JobSpec::new("/cfg/j.json", 0).with_priority(500))
        .await?;
    assert_eq!(job.priority, 500);

    let strict = TaskLifecycleManager::new(
        h.connector.clone(),
        LifecycleConfig {
            enforce_max_priority: true,
            ..LifecycleConfig::default()
        },
    );
    let err = strict
        .create_job(&task, JobSpec::new("/cfg/j.json", 1).with_priority(500))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Integrity);

    h.registry.set_max_priority("bob", 1000).await?;
    strict
        .create_job(&task, JobSpec::new("/cfg/j.json", 1).with_priority(500))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_query_facade() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let alice = h.registry.register_worker("alice", 1000, "").await?;
    h.registry.register_worker("bob", 1000, "").await?;

    h.manager.create_task(&alice, task_spec("a-lps", Cluster::Lps)).await?;
    h.manager.create_task(&alice, task_spec("a-sd", Cluster::Sdumont)).await?;
    h.manager.create_task(&alice, task_spec("a-lps2", Cluster::Lps)).await?;

    assert_eq!(h.queries.get_user("alice").await, Some(alice.clone()));
    assert!(h.queries.get_user("carol").await.is_none());
    assert_eq!(h.queries.get_all_users().await.len(), 2);

    let names = |tasks: Vec<orchestra_domain::entities::Task>| -> Vec<String> {
        tasks.into_iter().map(|t| t.task_name).collect()
    };
    assert_eq!(
        names(h.queries.get_all_tasks(&alice, None).await),
        vec!["a-lps", "a-sd", "a-lps2"]
    );
    assert_eq!(
        names(h.queries.get_all_tasks(&alice, Some(Cluster::Lps)).await),
        vec!["a-lps", "a-lps2"]
    );
    assert!(h
        .queries
        .get_all_tasks(&Worker::new("ghost", 1, ""), None)
        .await
        .is_empty());

    let created = h
        .queries
        .create_dataset(&Dataset::new("alice", "zee", Cluster::Lps, "/data/zee"))
        .await
        .unwrap();
    assert_eq!(h.queries.get_dataset("alice", "zee").await, Some(created));
    assert!(h.queries.get_dataset("alice", "jpsi").await.is_none());
    assert_eq!(h.queries.get_all_datasets("alice").await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_machine_registry() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;

    h.registry
        .register_node(Node::new("sd-gpu01", Cluster::Sdumont, 48, 4))
        .await?;
    h.registry
        .register_node(Node::new("lps-cpu01", Cluster::Lps, 32, 0))
        .await?;
    let err = h
        .registry
        .register_node(Node::new("bad", Cluster::Lps, -1, 0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidInput);

    h.registry.set_node_enabled("sd-gpu01", false).await?;
    assert!(!h.queries.get_machine("sd-gpu01").await.unwrap().enabled);
    assert!(h.queries.get_machine("missing").await.is_none());
    assert_eq!(h.queries.get_all_machines().await.len(), 2);

    let err = h.registry.set_node_enabled("missing", true).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_store_fails_every_call() -> Result<()> {
    let h = harness(LifecycleConfig::default()).await?;
    let alice = h.registry.register_worker("alice", 1000, "").await?;
    let task = h.manager.create_task(&alice, task_spec("T1", Cluster::Lps)).await?;
    h.connector.close().await;

    let err = h
        .manager
        .create_task(&alice, task_spec("T9", Cluster::Lps))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestraError::StoreUnavailable { attempts: 2 }));
    assert!(err.is_retryable());

    assert!(h
        .manager
        .create_job(&task, JobSpec::new("/cfg/j.json", 0))
        .await
        .or_none("create_job")
        .is_none());
    assert!(!h.manager.retry_task("T1").await.succeeded("retry_task"));
    assert!(!h.manager.delete_task("T1").await.succeeded("delete_task"));
    assert!(h.registry.register_worker("bob", 1, "").await.is_err());

    assert!(h.queries.get_task("T1").await.is_none());
    assert!(h.queries.get_all_users().await.is_empty());
    assert!(h.queries.get_all_tasks(&alice, None).await.is_empty());
    Ok(())
}
