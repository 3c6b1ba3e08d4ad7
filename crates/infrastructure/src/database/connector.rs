//! 存储连接器
//!
//! 每个编排进程持有一个 [`StoreConnector`]：它按集群解析存储端点，建立连接池，
//! 并在每次读写之前通过 [`LivenessProbe`] 做有界重试的存活探测。

use std::sync::Arc;

use async_trait::async_trait;
use orchestra_core::{
    config::{AppConfig, ClusterConfig, DatabaseConfig},
    OrchestraError, OrchestraResult,
};
use orchestra_domain::{
    repositories::{
        DatasetRepository, JobRepository, NodeRepository, StoreSession, TaskRepository,
        WorkerRepository,
    },
    value_objects::Cluster,
};
use tracing::{debug, info, instrument, warn};

use super::{
    manager::{DatabasePool, DatabaseType},
    postgres::{
        PostgresDatasetRepository, PostgresJobRepository, PostgresNodeRepository,
        PostgresTaskRepository, PostgresWorkerRepository,
    },
    probe::{HealthCheck, LivenessProbe, RetryPolicy},
    sqlite::{
        SqliteDatasetRepository, SqliteJobRepository, SqliteNodeRepository,
        SqliteTaskRepository, SqliteWorkerRepository,
    },
};

#[async_trait]
impl HealthCheck for DatabasePool {
    async fn health_check(&self) -> OrchestraResult<()> {
        DatabasePool::health_check(self).await
    }
}

/// 仓储集合，按后端类型一次性构建
struct Repositories {
    worker: Arc<dyn WorkerRepository>,
    task: Arc<dyn TaskRepository>,
    job: Arc<dyn JobRepository>,
    node: Arc<dyn NodeRepository>,
    dataset: Arc<dyn DatasetRepository>,
}

impl Repositories {
    fn for_pool(pool: &DatabasePool) -> Self {
        match pool {
            DatabasePool::PostgreSQL(pg) => Self {
                worker: Arc::new(PostgresWorkerRepository::new(pg.clone())),
                task: Arc::new(PostgresTaskRepository::new(pg.clone())),
                job: Arc::new(PostgresJobRepository::new(pg.clone())),
                node: Arc::new(PostgresNodeRepository::new(pg.clone())),
                dataset: Arc::new(PostgresDatasetRepository::new(pg.clone())),
            },
            DatabasePool::SQLite(sqlite) => Self {
                worker: Arc::new(SqliteWorkerRepository::new(sqlite.clone())),
                task: Arc::new(SqliteTaskRepository::new(sqlite.clone())),
                job: Arc::new(SqliteJobRepository::new(sqlite.clone())),
                node: Arc::new(SqliteNodeRepository::new(sqlite.clone())),
                dataset: Arc::new(SqliteDatasetRepository::new(sqlite.clone())),
            },
        }
    }
}

pub struct StoreConnector {
    cluster: Option<Cluster>,
    storage_path: Option<String>,
    pool: DatabasePool,
    probe: LivenessProbe,
    repositories: Repositories,
}

impl StoreConnector {
    /// 按集群标识连接存储
    ///
    /// 集群未在 `clusters.<name>` 中配置属于致命的配置错误。
    #[instrument(skip(config), fields(cluster = %cluster))]
    pub async fn connect(cluster: Cluster, config: &AppConfig) -> OrchestraResult<Self> {
        let cluster_config = config
            .cluster(cluster.config_key())
            .ok_or_else(|| OrchestraError::UnknownCluster(cluster.to_string()))?;

        let mut connector = Self::with_cluster_config(
            cluster_config,
            &config.database,
            RetryPolicy::from(&config.probe),
        )
        .await?;
        connector.cluster = Some(cluster);
        Ok(connector)
    }

    /// 按集群名连接，名称在这里解析
    pub async fn connect_named(cluster: &str, config: &AppConfig) -> OrchestraResult<Self> {
        let cluster: Cluster = cluster.parse()?;
        Self::connect(cluster, config).await
    }

    /// 直接以集群配置连接（不绑定集群标识）
    pub async fn with_cluster_config(
        cluster_config: &ClusterConfig,
        database: &DatabaseConfig,
        policy: RetryPolicy,
    ) -> OrchestraResult<Self> {
        let mut connector = Self::connect_url(&cluster_config.url, database, policy).await?;
        connector.storage_path = Some(cluster_config.storage_path.clone());
        Ok(connector)
    }

    /// 直接以URL连接
    pub async fn connect_url(
        url: &str,
        database: &DatabaseConfig,
        policy: RetryPolicy,
    ) -> OrchestraResult<Self> {
        let pool = DatabasePool::new(url, database).await?;
        let repositories = Repositories::for_pool(&pool);
        debug!(database_type = ?pool.database_type(), "存储连接池已建立");

        Ok(Self {
            cluster: None,
            storage_path: None,
            pool,
            probe: LivenessProbe::new(policy),
            repositories,
        })
    }

    pub fn cluster(&self) -> Option<Cluster> {
        self.cluster
    }

    pub fn database_type(&self) -> DatabaseType {
        self.pool.database_type()
    }

    /// 当前集群的产物根目录
    pub fn storage_path(&self) -> OrchestraResult<&str> {
        self.storage_path.as_deref().ok_or_else(|| {
            OrchestraError::config_error("当前连接未绑定集群存储路径")
        })
    }

    /// 建表（幂等）
    pub async fn migrate(&self) -> OrchestraResult<()> {
        self.pool.migrate().await
    }

    /// 建表并确认存储可用
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> OrchestraResult<()> {
        self.migrate().await?;
        let attempts = self.probe.probe(&self.pool).await?;
        info!(attempts, "存储连接器初始化完成");
        Ok(())
    }

    /// 持久化屏障
    ///
    /// 每个写操作返回时都已提交，这里只确认存储仍然可达。
    pub async fn commit(&self) -> OrchestraResult<()> {
        self.probe.probe(&self.pool).await.map(|_| ())
    }

    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            debug!("存储连接池已关闭");
        }
    }

    /// 确认提交后关闭；探测失败时仍然关闭连接池
    #[instrument(skip(self))]
    pub async fn finalize(&self) -> OrchestraResult<()> {
        let committed = self.commit().await;
        if let Err(e) = &committed {
            warn!(error = %e, "结束前存储不可达");
        }
        self.close().await;
        committed
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[async_trait]
impl StoreSession for StoreConnector {
    async fn is_connected(&self) -> bool {
        self.probe.is_alive(&self.pool).await
    }

    fn probe_attempts(&self) -> u32 {
        self.probe.policy().max_attempts
    }

    fn worker_repository(&self) -> Arc<dyn WorkerRepository> {
        Arc::clone(&self.repositories.worker)
    }

    fn task_repository(&self) -> Arc<dyn TaskRepository> {
        Arc::clone(&self.repositories.task)
    }

    fn job_repository(&self) -> Arc<dyn JobRepository> {
        Arc::clone(&self.repositories.job)
    }

    fn node_repository(&self) -> Arc<dyn NodeRepository> {
        Arc::clone(&self.repositories.node)
    }

    fn dataset_repository(&self) -> Arc<dyn DatasetRepository> {
        Arc::clone(&self.repositories.dataset)
    }
}
