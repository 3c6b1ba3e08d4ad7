use std::fs;

use anyhow::Result;
use orchestra::{common, AppConfig, Coarse, Orchestra};
use orchestra_core::config::{ClusterConfig, MultiStepMode};
use orchestra_domain::{
    entities::{JobSpec, TaskSpec},
    value_objects::{Cluster, Status},
};
use tempfile::TempDir;

fn write_config(dir: &TempDir, mode: &str) -> Result<String> {
    let db_path = dir.path().join("lps.db");
    let config = format!(
        r#"
[database]
max_connections = 4
min_connections = 1

[clusters.lps]
url = "sqlite://{}"
storage_path = "/scratch/lps"

[probe]
max_attempts = 2
backoff_seconds = 0

[lifecycle]
multi_step_mode = "{}"

[logging]
level = "debug"
format = "json"
"#,
        db_path.display(),
        mode
    );

    let path = dir.path().join("orchestra.toml");
    fs::write(&path, config)?;
    Ok(path.display().to_string())
}

#[tokio::test]
async fn test_alice_retry_scenario() -> Result<()> {
    let dir = TempDir::new()?;
    let config = common::load_config(Some(&write_config(&dir, "transactional")?))?;
    assert_eq!(config.lifecycle.multi_step_mode, MultiStepMode::Transactional);

    let session = Orchestra::open(&config, Cluster::Lps).await?;
    assert_eq!(session.storage_path()?, "/scratch/lps");

    let alice = session.registry().register_worker("alice", 1000, "").await?;
    let task = session
        .lifecycle()
        .create_task(
            &alice,
            TaskSpec::new("T1", "/cfg/t1.json", "/in", "/out", "img:1", Cluster::Lps),
        )
        .await?;

    let mut job_ids = Vec::new();
    for config_id in 0..2 {
        let job = session
            .lifecycle()
            .create_job(&task, JobSpec::new("/cfg/j.json", config_id))
            .await?;
        session
            .lifecycle()
            .transition_job(job.id, Status::Assigned)
            .await?;
        job_ids.push(job.id);
    }
    session
        .lifecycle()
        .transition_job(job_ids[0], Status::Failed)
        .await?;
    session
        .lifecycle()
        .transition_job(job_ids[1], Status::Succeeded)
        .await?;

    assert!(session.lifecycle().retry_task("T1").await.succeeded("retry_task"));
    let statuses: Vec<Status> = session
        .queries()
        .get_all_jobs(&task)
        .await
        .into_iter()
        .map(|j| j.status)
        .collect();
    assert_eq!(statuses, vec![Status::Assigned, Status::Succeeded]);

    session.commit().await?;
    session.finalize().await?;
    Ok(())
}

#[tokio::test]
async fn test_state_survives_sessions() -> Result<()> {
    let dir = TempDir::new()?;
    let config = common::load_config(Some(&write_config(&dir, "sequential")?))?;

    let first = Orchestra::open(&config, Cluster::Lps).await?;
    let alice = first.registry().register_worker("alice", 1000, "").await?;
    let task = first
        .lifecycle()
        .create_task(
            &alice,
            TaskSpec::new("T2", "/cfg/t2.json", "/in", "/out", "img:2", Cluster::Lps),
        )
        .await?;
    for config_id in 0..3 {
        first
            .lifecycle()
            .create_job(&task, JobSpec::new("/cfg/j.json", config_id))
            .await?;
    }
    first.finalize().await?;

    let second = Orchestra::open(&config, Cluster::Lps).await?;
    let task = second.queries().get_task("T2").await.unwrap();
    assert_eq!(second.queries().get_all_jobs(&task).await.len(), 3);

    assert_eq!(second.lifecycle().delete_task("T2").await?, 3);
    assert!(second.queries().get_task("T2").await.is_none());
    assert!(second.queries().get_all_jobs(&task).await.is_empty());
    let alice = second.queries().get_user("alice").await.unwrap();
    assert!(second.queries().get_all_tasks(&alice, None).await.is_empty());
    second.finalize().await?;
    Ok(())
}

#[tokio::test]
async fn test_unconfigured_cluster_fails_to_open() -> Result<()> {
    let config = AppConfig::default().with_cluster(
        "lps",
        ClusterConfig::new("sqlite::memory:", "/scratch/lps"),
    );

    assert!(Orchestra::open(&config, Cluster::Sdumont).await.is_err());

    let session = Orchestra::open(&config, Cluster::Lps).await?;
    assert_eq!(session.cluster(), Cluster::Lps);
    session.finalize().await?;
    Ok(())
}

#[tokio::test]
async fn test_closed_store_leaves_no_partial_state() -> Result<()> {
    let dir = TempDir::new()?;
    let config = common::load_config(Some(&write_config(&dir, "transactional")?))?;

    let session = Orchestra::open(&config, Cluster::Lps).await?;
    let alice = session.registry().register_worker("alice", 1000, "").await?;
    let task = session
        .lifecycle()
        .create_task(
            &alice,
            TaskSpec::new("T3", "/cfg/t3.json", "/in", "/out", "img:3", Cluster::Lps),
        )
        .await?;
    session
        .lifecycle()
        .create_job(&task, JobSpec::new("/cfg/j.json", 0))
        .await?;

    session.connector().close().await;
    assert!(!session.lifecycle().delete_task("T3").await.succeeded("delete_task"));
    assert!(session.commit().await.is_err());
    assert!(session.finalize().await.is_err());

    let reopened = Orchestra::open(&config, Cluster::Lps).await?;
    let task = reopened.queries().get_task("T3").await.unwrap();
    assert_eq!(reopened.queries().get_all_jobs(&task).await.len(), 1);
    reopened.finalize().await?;
    Ok(())
}
