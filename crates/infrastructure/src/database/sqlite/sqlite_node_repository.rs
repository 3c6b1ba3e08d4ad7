use async_trait::async_trait;
use orchestra_core::OrchestraResult;
use orchestra_domain::{entities::Node, repositories::NodeRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::instrument;

use crate::{error_handling::RepositoryErrorHelpers, store_context};

pub struct SqliteNodeRepository {
    pool: SqlitePool,
}

impl SqliteNodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_node(row: &SqliteRow) -> OrchestraResult<Node> {
        Ok(Node {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            cluster: row.try_get("cluster")?,
            cpu_slots: row.try_get("cpu_slots")?,
            gpu_slots: row.try_get("gpu_slots")?,
            enabled: row.try_get("enabled")?,
        })
    }
}

#[async_trait]
impl NodeRepository for SqliteNodeRepository {
    #[instrument(skip(self, node), fields(node_name = %node.name, cluster = %node.cluster))]
    async fn create(&self, node: &Node) -> OrchestraResult<Node> {
        let context = store_context!(Node, Create, name = &node.name);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO node (name, cluster, cpu_slots, gpu_slots, enabled)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(&node.name)
        .bind(node.cluster)
        .bind(node.cpu_slots)
        .bind(node.gpu_slots)
        .bind(node.enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        RepositoryErrorHelpers::log_operation_success(
            context.clone().with_id(id),
            &context.entity_description(),
            None,
        );
        Ok(Node {
            id,
            ..node.clone()
        })
    }

    #[instrument(skip(self), fields(node_name = %name))]
    async fn get_by_name(&self, name: &str) -> OrchestraResult<Option<Node>> {
        let context = store_context!(Node, Read, name = name);

        let row = sqlx::query(
            "SELECT id, name, cluster, cpu_slots, gpu_slots, enabled FROM node WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        row.as_ref().map(Self::row_to_node).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self) -> OrchestraResult<Vec<Node>> {
        let context = store_context!(Node, Query);

        let rows = sqlx::query(
            "SELECT id, name, cluster, cpu_slots, gpu_slots, enabled FROM node ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryErrorHelpers::database_error(context, e))?;

        rows.iter().map(Self::row_to_node).collect()
    }

    #[instrument(skip(self), fields(node_name = %name, enabled = %enabled))]
    async fn set_enabled(&self, name: &str, enabled: bool) -> OrchestraResult<bool> {
        let context = store_context!(Node, Update, name = name);

        let result = sqlx::query("UPDATE node SET enabled = ?1 WHERE name = ?2")
            .bind(enabled)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryErrorHelpers::database_error(context.clone(), e))?;

        Ok(result.rows_affected() > 0)
    }
}
