pub mod postgres_dataset_repository;
pub mod postgres_job_repository;
pub mod postgres_node_repository;
pub mod postgres_task_repository;
pub mod postgres_worker_repository;

pub use postgres_dataset_repository::PostgresDatasetRepository;
pub use postgres_job_repository::PostgresJobRepository;
pub use postgres_node_repository::PostgresNodeRepository;
pub use postgres_task_repository::PostgresTaskRepository;
pub use postgres_worker_repository::PostgresWorkerRepository;

use orchestra_core::OrchestraResult;
use sqlx::PgPool;
use tracing::debug;

use crate::error_handling::RepositoryErrorHelpers;
use crate::store_context;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS worker (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        max_priority INTEGER NOT NULL DEFAULT 1000,
        password_hash TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task (
        id BIGSERIAL PRIMARY KEY,
        task_name TEXT NOT NULL UNIQUE,
        input_file_path TEXT NOT NULL,
        output_file_path TEXT NOT NULL,
        config_file_path TEXT NOT NULL,
        container_image TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'registered',
        cluster TEXT NOT NULL,
        template_exec_args TEXT NOT NULL DEFAULT '{}',
        secondary_data_path TEXT NOT NULL DEFAULT '{}',
        et_bin_idx INTEGER,
        eta_bin_idx INTEGER,
        is_gpu BOOLEAN NOT NULL DEFAULT FALSE,
        owner_id BIGINT NOT NULL REFERENCES worker(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job (
        id BIGSERIAL PRIMARY KEY,
        config_file_path TEXT NOT NULL,
        container_image TEXT NOT NULL,
        config_id INTEGER NOT NULL,
        exec_args TEXT NOT NULL DEFAULT '{}',
        cluster TEXT NOT NULL,
        retry INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'registered',
        priority INTEGER NOT NULL DEFAULT 1000,
        is_gpu BOOLEAN NOT NULL DEFAULT FALSE,
        task_id BIGINT NOT NULL REFERENCES task(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS node (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        cluster TEXT NOT NULL,
        cpu_slots INTEGER NOT NULL DEFAULT 0,
        gpu_slots INTEGER NOT NULL DEFAULT 0,
        enabled BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dataset (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL,
        dataset TEXT NOT NULL,
        cluster TEXT NOT NULL,
        path TEXT NOT NULL DEFAULT ''
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_task_owner_id ON task(owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_job_task_id ON job(task_id)",
    "CREATE INDEX IF NOT EXISTS idx_job_status ON job(status)",
    "CREATE INDEX IF NOT EXISTS idx_node_cluster ON node(cluster)",
    "CREATE INDEX IF NOT EXISTS idx_dataset_username ON dataset(username, dataset)",
];

/// 运行数据库迁移
pub async fn run_migrations(pool: &PgPool) -> OrchestraResult<()> {
    debug!("Running PostgreSQL database migrations");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(store_context!(Schema, Migrate), e))?;
    }

    debug!("Successfully completed PostgreSQL database migrations");
    Ok(())
}
