use std::sync::Arc;

use anyhow::{Context, Result};
use orchestra_core::config::AppConfig;
use orchestra_domain::{repositories::StoreSession, value_objects::Cluster};
use orchestra_infrastructure::StoreConnector;
use orchestra_lifecycle::{QueryFacade, ResourceRegistry, TaskLifecycleManager};
use tracing::{info, warn};

use crate::common::mask_database_url;

/// 一个编排进程对某个集群存储的完整会话
///
/// 生命周期：[`Orchestra::open`]（连接、建表、探测）→ 使用 → [`Orchestra::finalize`]。
pub struct Orchestra {
    cluster: Cluster,
    connector: Arc<StoreConnector>,
    lifecycle: TaskLifecycleManager,
    queries: QueryFacade,
    registry: ResourceRegistry,
}

impl Orchestra {
    pub async fn open(config: &AppConfig, cluster: Cluster) -> Result<Self> {
        let cluster_config = config
            .cluster(cluster.config_key())
            .with_context(|| format!("集群 {cluster} 未配置存储"))?;
        info!(
            cluster = %cluster,
            url = %mask_database_url(&cluster_config.url),
            "连接集群存储"
        );

        let connector = StoreConnector::connect(cluster, config)
            .await
            .with_context(|| format!("连接集群 {cluster} 的存储失败"))?;
        connector
            .initialize()
            .await
            .with_context(|| format!("初始化集群 {cluster} 的存储失败"))?;

        let connector = Arc::new(connector);
        let session: Arc<dyn StoreSession> = connector.clone();

        Ok(Self {
            cluster,
            lifecycle: TaskLifecycleManager::new(session.clone(), config.lifecycle.clone()),
            queries: QueryFacade::new(session.clone()),
            registry: ResourceRegistry::new(session),
            connector,
        })
    }

    pub fn cluster(&self) -> Cluster {
        self.cluster
    }

    pub fn lifecycle(&self) -> &TaskLifecycleManager {
        &self.lifecycle
    }

    pub fn queries(&self) -> &QueryFacade {
        &self.queries
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn connector(&self) -> &StoreConnector {
        &self.connector
    }

    /// 集群的产物根目录
    pub fn storage_path(&self) -> Result<&str> {
        Ok(self.connector.storage_path()?)
    }

    pub async fn commit(&self) -> Result<()> {
        self.connector.commit().await.context("存储提交确认失败")
    }

    /// 确认提交并释放连接；提交失败时连接同样被释放
    pub async fn finalize(self) -> Result<()> {
        let result = self.connector.finalize().await;
        if let Err(e) = &result {
            warn!(cluster = %self.cluster, error = %e, "会话结束时存储不可达");
        } else {
            info!(cluster = %self.cluster, "会话已结束");
        }
        result.context("结束会话失败")
    }
}
