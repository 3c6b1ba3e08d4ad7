use async_trait::async_trait;
use orchestra_core::OrchestraResult;
use orchestra_domain::{entities::Task, repositories::TaskRepository, value_objects::Status};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, instrument};

use crate::{error_handling::RepositoryErrorHelpers, store_context};

const TASK_COLUMNS: &str = "id, task_name, input_file_path, output_file_path, config_file_path, \
     container_image, status, cluster, template_exec_args, secondary_data_path, \
     et_bin_idx, eta_bin_idx, is_gpu, owner_id";

pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &SqliteRow) -> OrchestraResult<Task> {
        Ok(Task {
            id: row.try_get("id")?,
            task_name: row.try_get("task_name")?,
            input_file_path: row.try_get("input_file_path")?,
            output_file_path: row.try_get("output_file_path")?,
            config_file_path: row.try_get("config_file_path")?,
            container_image: row.try_get("container_image")?,
            cluster: row.try_get("cluster")?,
            status: row.try_get("status")?,
            template_exec_args: row.try_get("template_exec_args")?,
            secondary_data_path: row.try_get("secondary_data_path")?,
            et_bin_idx: row.try_get("et_bin_idx")?,
            eta_bin_idx: row.try_get("eta_bin_idx")?,
            is_gpu: row.try_get("is_gpu")?,
            owner_id: row.try_get("owner_id")?,
        })
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    #[instrument(skip(self, task), fields(
        task_name = %task.task_name,
        cluster = %task.cluster,
        owner_id = %task.owner_id,
    ))]
    async fn create(&self, task: &Task) -> OrchestraResult<Task> {
        let context = store_context!(Task, Create, name = &task.task_name);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO task (task_name, input_file_path, output_file_path, config_file_path,
                              container_image, status, cluster, template_exec_args,
                              secondary_data_path, et_bin_idx, eta_bin_idx, is_gpu, owner_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING id
            "#,
        )
        .bind(&task.task_name)
        .bind(&task.input_file_path)
        .bind(&task.output_file_path)
        .bind(&task.config_file_path)
        .bind(&task.container_image)
        .bind(task.status)
        .bind(task.cluster)
        .bind(&task.template_exec_args)
        .bind(&task.secondary_data_path)
        .bind(task.et_bin_idx)
        .bind(task.eta_bin_idx)
        .bind(task.is_gpu)
        .bind(task.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let created = Task {
            id,
            ..task.clone()
        };
        RepositoryErrorHelpers::log_operation_success(
            context.with_id(id),
            &created.entity_description(),
            Some(&format!("集群: {}", created.cluster)),
        );
        Ok(created)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn get_by_id(&self, id: i64) -> OrchestraResult<Option<Task>> {
        let context = store_context!(Task, Read, id = id);

        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM task WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_task).transpose()
    }

    #[instrument(skip(self), fields(task_name = %task_name))]
    async fn get_by_name(&self, task_name: &str) -> OrchestraResult<Option<Task>> {
        let context = store_context!(Task, Read, name = task_name);

        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM task WHERE task_name = ?1"))
            .bind(task_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        let task = row.as_ref().map(Self::row_to_task).transpose()?;
        if task.is_none() {
            debug!("任务 '{}' 不存在", task_name);
        }
        Ok(task)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_by_owner(&self, owner_id: i64) -> OrchestraResult<Vec<Task>> {
        let context = store_context!(Task, Query).with_additional_info(format!("owner_id={owner_id}"));

        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM task WHERE owner_id = ?1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_task).collect()
    }

    #[instrument(skip(self), fields(task_id = %id, status = %status))]
    async fn update_status(&self, id: i64, status: Status) -> OrchestraResult<()> {
        let context = store_context!(Task, Update, id = id);

        let result = sqlx::query("UPDATE task SET status = ?1 WHERE id = ?2")
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

    #[instrument(skip(self), fields(task_id = %id))]
    async fn delete(&self, id: i64) -> OrchestraResult<bool> {
        let context = store_context!(Task, Delete, id = id);

        let result = sqlx::query("DELETE FROM task WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            RepositoryErrorHelpers::log_operation_success(
                context.clone(),
                &context.entity_description(),
                None,
            );
        }
        Ok(deleted)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn delete_with_jobs(&self, id: i64) -> OrchestraResult<u64> {
        let context = store_context!(Task, BatchDelete, id = id);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        let jobs = sqlx::query("DELETE FROM job WHERE task_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?
            .rows_affected();

        let tasks = sqlx::query("DELETE FROM task WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?
            .rows_affected();

        // 任务不存在时回滚（tx 析构即回滚）
        if tasks == 0 {
            return Err(RepositoryErrorHelpers::not_found(context));
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        RepositoryErrorHelpers::log_operation_success(
            context.clone(),
            &context.entity_description(),
            Some(&format!("同时删除{jobs}个作业")),
        );
        Ok(jobs)
    }
}
