//! In-memory cacher backends.

pub mod bounded;
pub mod timeout;

pub use bounded::BoundedCacher;
pub use timeout::TimeoutCacher;
