pub mod sqlite_dataset_repository;
pub mod sqlite_job_repository;
pub mod sqlite_node_repository;
pub mod sqlite_task_repository;
pub mod sqlite_worker_repository;

pub use sqlite_dataset_repository::SqliteDatasetRepository;
pub use sqlite_job_repository::SqliteJobRepository;
pub use sqlite_node_repository::SqliteNodeRepository;
pub use sqlite_task_repository::SqliteTaskRepository;
pub use sqlite_worker_repository::SqliteWorkerRepository;

use orchestra_core::OrchestraResult;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error_handling::RepositoryErrorHelpers;
use crate::store_context;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS worker (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        max_priority INTEGER NOT NULL DEFAULT 1000,
        password_hash TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
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
        is_gpu BOOLEAN NOT NULL DEFAULT 0,
        owner_id INTEGER NOT NULL,
        FOREIGN KEY (owner_id) REFERENCES worker(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        config_file_path TEXT NOT NULL,
        container_image TEXT NOT NULL,
        config_id INTEGER NOT NULL,
        exec_args TEXT NOT NULL DEFAULT '{}',
        cluster TEXT NOT NULL,
        retry INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'registered',
        priority INTEGER NOT NULL DEFAULT 1000,
        is_gpu BOOLEAN NOT NULL DEFAULT 0,
        task_id INTEGER NOT NULL,
        FOREIGN KEY (task_id) REFERENCES task(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS node (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        cluster TEXT NOT NULL,
        cpu_slots INTEGER NOT NULL DEFAULT 0,
        gpu_slots INTEGER NOT NULL DEFAULT 0,
        enabled BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dataset (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
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
pub async fn run_migrations(pool: &SqlitePool) -> OrchestraResult<()> {
    debug!("Running SQLite database migrations");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(store_context!(Schema, Migrate), e))?;
    }

    debug!("Successfully completed SQLite database migrations");
    Ok(())
}
