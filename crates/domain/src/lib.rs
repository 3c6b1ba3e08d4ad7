pub mod entities;
pub mod repositories;
pub mod sqlx_impls;
pub mod value_objects;

pub use entities::*;
pub use orchestra_core::{FailureKind, OrchestraError, OrchestraResult};
pub use repositories::*;
pub use value_objects::*;
