//! Rendered-artifact cache.
//!
//! One slot per (device, persona). Entries expire after a TTL derived from the device's
//! refresh interval and number of cacheable modes; expiry is enforced lazily on lookup.
//!
//! ```toml
//! [cache]
//! coalesce_batches = false
//! ```

mod config;
mod flight;
mod keys;
mod store;
mod ttl;

pub use config::CacheConfig;
pub use flight::{BatchGuard, InFlightBatches, InFlightError};
pub use keys::CacheKey;
pub use store::ContentCache;
pub(crate) use store::{METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
pub use ttl::Ttl;
