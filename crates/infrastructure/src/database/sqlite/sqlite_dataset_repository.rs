use async_trait::async_trait;
use orchestra_core::OrchestraResult;
use orchestra_domain::{entities::Dataset, repositories::DatasetRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::instrument;

use crate::{error_handling::RepositoryErrorHelpers, store_context};

pub struct SqliteDatasetRepository {
    pool: SqlitePool,
}

impl SqliteDatasetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_dataset(row: &SqliteRow) -> OrchestraResult<Dataset> {
        Ok(Dataset {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            dataset: row.try_get("dataset")?,
            cluster: row.try_get("cluster")?,
            path: row.try_get("path")?,
        })
    }
}

#[async_trait]
impl DatasetRepository for SqliteDatasetRepository {
    #[instrument(skip(self, dataset), fields(username = %dataset.username, dataset = %dataset.dataset))]
    async fn create(&self, dataset: &Dataset) -> OrchestraResult<Dataset> {
        let context = store_context!(Dataset, Create, name = &dataset.username)
            .with_additional_info(dataset.dataset.clone());

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO dataset (username, dataset, cluster, path) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(&dataset.username)
        .bind(&dataset.dataset)
        .bind(dataset.cluster)
        .bind(&dataset.path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        RepositoryErrorHelpers::log_operation_success(
            context.with_id(id),
            &format!("数据集 '{}'", dataset.dataset),
            Some(&format!("用户: {}", dataset.username)),
        );
        Ok(Dataset {
            id,
            ..dataset.clone()
        })
    }

    /// 同名数据集允许重复登记，返回最早的一条
    #[instrument(skip(self), fields(username = %username, dataset = %dataset))]
    async fn get(&self, username: &str, dataset: &str) -> OrchestraResult<Option<Dataset>> {
        let context = store_context!(Dataset, Read, name = username)
            .with_additional_info(dataset.to_string());

        let row = sqlx::query(
            r#"
            SELECT id, username, dataset, cluster, path FROM dataset
            WHERE username = ?1 AND dataset = ?2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(dataset)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_dataset).transpose()
    }

    #[instrument(skip(self), fields(username = %username))]
    async fn list_by_username(&self, username: &str) -> OrchestraResult<Vec<Dataset>> {
        let context = store_context!(Dataset, Query, name = username);

        let rows = sqlx::query(
            "SELECT id, username, dataset, cluster, path FROM dataset WHERE username = ?1 ORDER BY id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_dataset).collect()
    }
}
