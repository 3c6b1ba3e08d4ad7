pub mod connector;
pub mod manager;
pub mod postgres;
pub mod probe;
pub mod sqlite;

pub use connector::StoreConnector;
pub use manager::{DatabasePool, DatabaseType};
pub use postgres::{
    PostgresDatasetRepository, PostgresJobRepository, PostgresNodeRepository,
    PostgresTaskRepository, PostgresWorkerRepository,
};
pub use probe::{HealthCheck, LivenessProbe, RetryPolicy};
pub use sqlite::{
    SqliteDatasetRepository, SqliteJobRepository, SqliteNodeRepository, SqliteTaskRepository,
    SqliteWorkerRepository,
};
