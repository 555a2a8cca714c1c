//! Builders to construct hubs from configuration.

pub mod hub_builder;

pub use hub_builder::{
    build_cache_hub, build_resolver, build_result_cacher, build_status_hub, build_work_cacher,
    build_work_hub,
};
