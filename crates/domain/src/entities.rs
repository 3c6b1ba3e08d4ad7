use orchestra_core::{OrchestraError, OrchestraResult};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Cluster, Status};

/// 作业默认优先级
pub const DEFAULT_JOB_PRIORITY: i32 = 1000;

/// 任务/作业参数的默认值（空的JSON对象）
pub const EMPTY_ARGS: &str = "{}";

/// 注册用户。账号由外部认证服务创建，这里只保存引用
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Worker {
    pub id: i64,
    pub username: String,
    /// 该用户可为作业申请的最高优先级
    pub max_priority: i32,
    /// 由外部认证服务维护，本层不做校验
    pub password_hash: String,
}

impl Worker {
    pub fn new(username: impl Into<String>, max_priority: i32, password_hash: impl Into<String>) -> Self {
        Self {
            id: 0, // 将由数据库生成
            username: username.into(),
            max_priority,
            password_hash: password_hash.into(),
        }
    }

    pub fn allows_priority(&self, priority: i32) -> bool {
        priority <= self.max_priority
    }

    pub fn entity_description(&self) -> String {
        format!("用户 '{}' (ID: {})", self.username, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub task_name: String,
    pub input_file_path: String,
    pub output_file_path: String,
    pub config_file_path: String,
    pub container_image: String,
    pub cluster: Cluster,
    pub status: Status,
    pub template_exec_args: String,
    pub secondary_data_path: String,
    pub et_bin_idx: Option<i32>,
    pub eta_bin_idx: Option<i32>,
    pub is_gpu: bool,
    /// 所属用户（反向引用）
    pub owner_id: i64,
}

impl Task {
    /// 由创建请求构造任务，初始状态总是 `registered`
    pub fn from_spec(owner: &Worker, spec: TaskSpec) -> Self {
        Self {
            id: 0,
            task_name: spec.task_name,
            input_file_path: spec.input_file_path,
            output_file_path: spec.output_file_path,
            config_file_path: spec.config_file_path,
            container_image: spec.container_image,
            cluster: spec.cluster,
            status: Status::Registered,
            template_exec_args: spec.template_exec_args,
            secondary_data_path: spec.secondary_data_path,
            et_bin_idx: spec.et_bin_idx,
            eta_bin_idx: spec.eta_bin_idx,
            is_gpu: spec.is_gpu,
            owner_id: owner.id,
        }
    }

    pub fn entity_description(&self) -> String {
        format!("任务 '{}' (ID: {}, 集群: {})", self.task_name, self.id, self.cluster)
    }
}

/// 创建任务的请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub task_name: String,
    pub config_file_path: String,
    pub input_file_path: String,
    pub output_file_path: String,
    pub container_image: String,
    pub cluster: Cluster,
    pub template_exec_args: String,
    pub secondary_data_path: String,
    pub et_bin_idx: Option<i32>,
    pub eta_bin_idx: Option<i32>,
    pub is_gpu: bool,
}

impl TaskSpec {
    pub fn new(
        task_name: impl Into<String>,
        config_file_path: impl Into<String>,
        input_file_path: impl Into<String>,
        output_file_path: impl Into<String>,
        container_image: impl Into<String>,
        cluster: Cluster,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            config_file_path: config_file_path.into(),
            input_file_path: input_file_path.into(),
            output_file_path: output_file_path.into(),
            container_image: container_image.into(),
            cluster,
            template_exec_args: EMPTY_ARGS.to_string(),
            secondary_data_path: EMPTY_ARGS.to_string(),
            et_bin_idx: None,
            eta_bin_idx: None,
            is_gpu: false,
        }
    }

    pub fn with_template_exec_args(mut self, args: impl Into<String>) -> Self {
        self.template_exec_args = args.into();
        self
    }

    pub fn with_secondary_data_path(mut self, path: impl Into<String>) -> Self {
        self.secondary_data_path = path.into();
        self
    }

    pub fn with_bin_indices(mut self, et_bin_idx: Option<i32>, eta_bin_idx: Option<i32>) -> Self {
        self.et_bin_idx = et_bin_idx;
        self.eta_bin_idx = eta_bin_idx;
        self
    }

    pub fn with_gpu(mut self, is_gpu: bool) -> Self {
        self.is_gpu = is_gpu;
        self
    }

    pub fn validate(&self) -> OrchestraResult<()> {
        if self.task_name.trim().is_empty() {
            return Err(OrchestraError::validation_error("任务名称不能为空"));
        }
        if self.container_image.trim().is_empty() {
            return Err(OrchestraError::validation_error("容器镜像不能为空"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: i64,
    pub config_file_path: String,
    pub config_id: i32,
    /// 创建时继承自所属任务
    pub container_image: String,
    pub exec_args: String,
    /// 创建时继承自所属任务
    pub cluster: Cluster,
    pub priority: i32,
    /// 已重试次数，只增不减
    pub retry: i32,
    pub status: Status,
    pub is_gpu: bool,
    pub task_id: i64,
}

impl Job {
    /// 由创建请求构造作业：状态 `registered`，`retry = 0`，镜像与集群取自任务
    pub fn from_spec(task: &Task, spec: JobSpec) -> Self {
        Self {
            id: 0,
            config_file_path: spec.config_file_path,
            config_id: spec.config_id,
            container_image: task.container_image.clone(),
            exec_args: spec.exec_args,
            cluster: task.cluster,
            priority: spec.priority,
            retry: 0,
            status: Status::Registered,
            is_gpu: spec.is_gpu,
            task_id: task.id,
        }
    }

    pub fn entity_description(&self) -> String {
        format!(
            "作业 (ID: {}, 任务ID: {}, 配置: {})",
            self.id, self.task_id, self.config_id
        )
    }
}

/// 创建作业的请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub config_file_path: String,
    pub config_id: i32,
    pub priority: i32,
    pub exec_args: String,
    pub is_gpu: bool,
}

impl JobSpec {
    pub fn new(config_file_path: impl Into<String>, config_id: i32) -> Self {
        Self {
            config_file_path: config_file_path.into(),
            config_id,
            priority: DEFAULT_JOB_PRIORITY,
            exec_args: EMPTY_ARGS.to_string(),
            is_gpu: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_exec_args(mut self, exec_args: impl Into<String>) -> Self {
        self.exec_args = exec_args.into();
        self
    }

    pub fn with_gpu(mut self, is_gpu: bool) -> Self {
        self.is_gpu = is_gpu;
        self
    }
}

/// 集群中的计算节点，分配逻辑由外部调度器负责
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub cluster: Cluster,
    pub cpu_slots: i32,
    pub gpu_slots: i32,
    pub enabled: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, cluster: Cluster, cpu_slots: i32, gpu_slots: i32) -> Self {
        Self {
            id: 0,
            name: name.into(),
            cluster,
            cpu_slots,
            gpu_slots,
            enabled: true,
        }
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu_slots > 0
    }
}

/// 用户的数据产物。(username, dataset) 唯一性由调用方保证
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dataset {
    pub id: i64,
    pub username: String,
    pub dataset: String,
    pub cluster: Cluster,
    pub path: String,
}

impl Dataset {
    pub fn new(
        username: impl Into<String>,
        dataset: impl Into<String>,
        cluster: Cluster,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            username: username.into(),
            dataset: dataset.into(),
            cluster,
            path: path.into(),
        }
    }
}
