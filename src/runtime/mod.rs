//! Runtime adapters and the service facade.

pub mod api;
pub mod tokio_spawner;

pub use api::{AlarmService, Health, ServiceSnapshot};
pub use tokio_spawner::TokioSpawner;
