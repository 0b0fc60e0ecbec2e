pub mod mock;
pub mod openweather;
pub mod types;

use moka::future::Cache;
use std::sync::Arc;
use types::DerivedResult;

/// Session-lifetime cache of derived results keyed by canonical location
/// string. Entries are never expired; a location derived once stays valid
/// until the process restarts.
pub type DerivedCache = Cache<String, Arc<DerivedResult>>;

pub fn init_derived_cache() -> DerivedCache {
    Cache::builder().max_capacity(10_000).build()
}
