mod key;
mod store;

pub use key::CacheKey;
pub use store::{CacheStore, CachedMetrics, DisabledCache, ResponseCache};
