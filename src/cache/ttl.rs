//! Derived time-to-live policy.
//!
//! One full refresh cycle of a device visits every cacheable persona once, so an entry must
//! survive `refresh_interval × cacheable_modes` minutes, plus a 10% margin.

use std::time::Duration;

use crate::domain::device::EffectiveConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ttl {
    minutes: u64,
}

impl Ttl {
    pub fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    /// `floor(refresh_interval × cacheable_modes × 1.1)` minutes, in exact integer arithmetic.
    pub fn derive(refresh_interval_minutes: u32, cacheable_modes: usize) -> Self {
        let cycle = u64::from(refresh_interval_minutes).saturating_mul(cacheable_modes as u64);
        Self::from_minutes(cycle.saturating_mul(11) / 10)
    }

    pub fn for_config(config: &EffectiveConfig) -> Self {
        Self::derive(
            config.refresh_interval_minutes,
            config.cacheable_modes().len(),
        )
    }

    pub fn minutes(self) -> u64 {
        self.minutes
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.minutes.saturating_mul(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::{DeviceConfig, DeviceKey};

    #[test]
    fn hourly_refresh_with_three_modes() {
        assert_eq!(Ttl::derive(60, 3).minutes(), 198);
    }

    #[test]
    fn floors_fractional_minutes() {
        assert_eq!(Ttl::derive(30, 2).minutes(), 66);
        assert_eq!(Ttl::derive(7, 1).minutes(), 7);
        assert_eq!(Ttl::derive(5, 3).minutes(), 16);
    }

    #[test]
    fn no_cacheable_modes_means_immediate_expiry() {
        assert_eq!(Ttl::derive(60, 0).minutes(), 0);
        assert_eq!(Ttl::derive(60, 0).as_duration(), Duration::ZERO);
    }

    #[test]
    fn only_cacheable_modes_count() {
        let mut config = DeviceConfig::new(DeviceKey::parse("A1").expect("device key"));
        config.modes = vec!["STOIC".into(), "ERROR".into(), "ZEN".into()];
        config.refresh_interval = 60;
        let effective = EffectiveConfig::from_config(&config);
        assert_eq!(Ttl::for_config(&effective).minutes(), 132);
    }
}
