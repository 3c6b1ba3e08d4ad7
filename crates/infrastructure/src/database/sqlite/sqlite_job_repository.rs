use async_trait::async_trait;
use orchestra_core::OrchestraResult;
use orchestra_domain::{entities::Job, repositories::JobRepository, value_objects::Status};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::instrument;

use crate::{error_handling::RepositoryErrorHelpers, store_context};

const JOB_COLUMNS: &str = "id, config_file_path, container_image, config_id, exec_args, cluster, \
     retry, status, priority, is_gpu, task_id";

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &SqliteRow) -> OrchestraResult<Job> {
        Ok(Job {
            id: row.try_get("id")?,
            config_file_path: row.try_get("config_file_path")?,
            config_id: row.try_get("config_id")?,
            container_image: row.try_get("container_image")?,
            exec_args: row.try_get("exec_args")?,
            cluster: row.try_get("cluster")?,
            priority: row.try_get("priority")?,
            retry: row.try_get("retry")?,
            status: row.try_get("status")?,
            is_gpu: row.try_get("is_gpu")?,
            task_id: row.try_get("task_id")?,
        })
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    #[instrument(skip(self, job), fields(task_id = %job.task_id, config_id = %job.config_id))]
    async fn create(&self, job: &Job) -> OrchestraResult<Job> {
        let context = store_context!(Job, Create)
            .with_additional_info(format!("task_id={}", job.task_id));

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO job (config_file_path, container_image, config_id, exec_args, cluster,
                             retry, status, priority, is_gpu, task_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id
            "#,
        )
        .bind(&job.config_file_path)
        .bind(&job.container_image)
        .bind(job.config_id)
        .bind(&job.exec_args)
        .bind(job.cluster)
        .bind(job.retry)
        .bind(job.status)
        .bind(job.priority)
        .bind(job.is_gpu)
        .bind(job.task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Job {
            id,
            ..job.clone()
        };
        RepositoryErrorHelpers::log_operation_success(
            context.with_id(id),
            &created.entity_description(),
            Some(&format!("优先级: {}", created.priority)),
        );
        Ok(created)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Job>> {
        let context = store_context!(Job, Read, id = id);

        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM job WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_job).transpose()
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    async fn list_by_task(&self, task_id: i64) -> OrchestraResult<Vec<Job>> {
        let context = store_context!(Job, Query).with_additional_info(format!("task_id={task_id}"));

        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job WHERE task_id = ?1 ORDER BY id"
        ))
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_job).collect()
    }

    #[instrument(skip(self), fields(job_id = %id, status = %status))]
    async fn update_status(&self, id: i64, status: Status) -> OrchestraResult<()> {
        let context = store_context!(Job, Update, id = id);

        let result = sqlx::query("UPDATE job SET status = ?1 WHERE id = ?2")
            .bind(status)
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
            Some(&format!("新状态: {status}")),
        );
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn increment_retry(&self, id: i64) -> OrchestraResult<i32> {
        let context = store_context!(Job, Update, id = id);

        let retry: Option<i32> =
            sqlx::query_scalar("UPDATE job SET retry = retry + 1 WHERE id = ?1 RETURNING retry")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        match retry {
            Some(retry) => {
                RepositoryErrorHelpers::log_operation_success(
                    context.clone(),
                    &context.entity_description(),
                    Some(&format!("重试次数: {retry}")),
                );
                Ok(retry)
            }
            None => Err(RepositoryErrorHelpers::not_found(context)),
        }
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    async fn delete_by_task(&self, task_id: i64) -> OrchestraResult<u64> {
        let context =
            store_context!(Job, BatchDelete).with_additional_info(format!("task_id={task_id}"));

        let result = sqlx::query("DELETE FROM job WHERE task_id = ?1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    async fn requeue_failed(&self, task_id: i64) -> OrchestraResult<u64> {
        let context =
            store_context!(Job, BatchUpdate).with_additional_info(format!("task_id={task_id}"));

        // 单条语句即单个事务
        let result = sqlx::query("UPDATE job SET status = ?1 WHERE task_id = ?2 AND status = ?3")
            .bind(Status::Assigned)
            .bind(task_id)
            .bind(Status::Failed)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let requeued = result.rows_affected();
        RepositoryErrorHelpers::log_operation_success(
            context,
            "失败作业",
            Some(&format!("重新分配{requeued}个作业")),
        );
        Ok(requeued)
    }
}
