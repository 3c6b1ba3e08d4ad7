use async_trait::async_trait;
use orchestra_core::OrchestraResult;
use orchestra_domain::{entities::Worker, repositories::WorkerRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, instrument};

use crate::{error_handling::RepositoryErrorHelpers, store_context};

pub struct SqliteWorkerRepository {
    pool: SqlitePool,
}

impl SqliteWorkerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_worker(row: &SqliteRow) -> OrchestraResult<Worker> {
        Ok(Worker {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            max_priority: row.try_get("max_priority")?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}

#[async_trait]
impl WorkerRepository for SqliteWorkerRepository {
    #[instrument(skip(self, worker), fields(username = %worker.username))]
    async fn create(&self, worker: &Worker) -> OrchestraResult<Worker> {
        let context = store_context!(Worker, Create, name = &worker.username);

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO worker (username, max_priority, password_hash) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(&worker.username)
        .bind(worker.max_priority)
        .bind(&worker.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Worker {
            id,
            ..worker.clone()
        };
        RepositoryErrorHelpers::log_operation_success(
            context.with_id(id),
            &created.entity_description(),
            None,
        );
        Ok(created)
    }

    #[instrument(skip(self), fields(worker_id = %id))]
    async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Worker>> {
        let context = store_context!(Worker, Read, id = id);

        let row = sqlx::query(
            "SELECT id, username, max_priority, password_hash FROM worker WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_worker).transpose()
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn get_by_username(&self, username: &str) -> OrchestraResult<Option<Worker>> {
        let context = store_context!(Worker, Read, name = username);

        let row = sqlx::query(
            "SELECT id, username, max_priority, password_hash FROM worker WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        let worker = row.as_ref().map(Self::row_to_worker).transpose()?;
        if worker.is_none() {
            debug!("用户 '{}' 不存在", username);
        }
        Ok(worker)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> OrchestraResult<Vec<Worker>> {
        let context = store_context!(Worker, Query);

        let rows = sqlx::query(
            "SELECT id, username, max_priority, password_hash FROM worker ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_worker).collect()
    }

    #[instrument(skip(self), fields(worker_id = %id, max_priority = %max_priority))]
    async fn update_max_priority(&self, id: i64, max_priority: i32) -> OrchestraResult<()> {
        let context = store_context!(Worker, Update, id = id);

        let result = sqlx::query("UPDATE worker SET max_priority = ?1 WHERE id = ?2")
            .bind(max_priority)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryErrorHelpers::not_found(context));
        }

        RepositoryErrorHelpers::log_operation_success(
            context.clone(),
            &context.entity_description(),
            Some(&format!("最高优先级: {max_priority}")),
        );
        Ok(())
    }
}
