//! Cache configuration.

use serde::Deserialize;

/// Cache behaviour toggles from the `[cache]` settings table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Allow at most one warm-up batch per device at a time.
    ///
    /// Off by default: two polls that miss concurrently both regenerate.
    pub coalesce_batches: bool,
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            coalesce_batches: settings.coalesce_batches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_are_not_coalesced_by_default() {
        assert!(!CacheConfig::default().coalesce_batches);
    }
}
