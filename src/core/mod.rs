//! Core scheduling abstractions: the work contract, retry policy, cachers and
//! the layered hubs.

pub mod cache_hub;
pub mod cacher;
pub mod cruiser;
pub mod error;
pub mod executor;
pub mod handler;
pub mod resolver;
pub mod status_hub;
pub mod work;
pub mod work_hub;

pub use cache_hub::CacheHub;
pub use cacher::Cacher;
pub use cruiser::{Cruiser, Tick};
pub use error::{AppResult, ErrorKind, HubError, WorkError};
pub use executor::{Spawn, Work, WorkOutput};
pub use handler::WorkHandler;
pub use resolver::{RetryResolver, TolerableErrorResolver};
pub use status_hub::StatusHub;
pub use work::{AsyncWork, WorkContext, WorkId, WorkPhase};
pub use work_hub::{HubControl, WorkHub, WorkObserver};
