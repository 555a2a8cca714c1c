//! Runtime adapters for executing work bodies, and the serializable API surface.

pub mod api;
pub mod thread_spawner;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use api::{HubSnapshot, WorkSnapshot};
pub use thread_spawner::ThreadSpawner;
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;
