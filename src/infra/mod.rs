//! Infrastructure adapters: in-memory cacher backends.

pub mod cache;

pub use cache::{BoundedCacher, TimeoutCacher};
