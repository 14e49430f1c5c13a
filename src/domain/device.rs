//! Device identity and per-device display configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::persona::{DEFAULT_MODES, Persona};

pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u32 = 60;

/// Stable identifier of one physical display (its hardware address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Returns `None` for blank input so an empty `mac=` query behaves like an absent one.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeviceKey {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or("device key must not be blank")
    }
}

impl From<DeviceKey> for String {
    fn from(key: DeviceKey) -> Self {
        key.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStrategy {
    /// Round-robin through the configured modes, one step per served poll.
    Cycle,
    #[default]
    #[serde(other)]
    Random,
}

impl RefreshStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshStrategy::Cycle => "cycle",
            RefreshStrategy::Random => "random",
        }
    }
}

/// Device configuration as persisted by the config store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub mac: DeviceKey,
    #[serde(default)]
    pub modes: Vec<String>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u32,
    #[serde(default)]
    pub refresh_strategy: RefreshStrategy,
    pub city: Option<String>,
    pub language: Option<String>,
    pub content_tone: Option<String>,
    #[serde(default)]
    pub character_tones: Vec<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
}

fn default_refresh_interval() -> u32 {
    DEFAULT_REFRESH_INTERVAL_MINUTES
}

impl DeviceConfig {
    pub fn new(mac: DeviceKey) -> Self {
        Self {
            mac,
            modes: Vec::new(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MINUTES,
            refresh_strategy: RefreshStrategy::default(),
            city: None,
            language: None,
            content_tone: None,
            character_tones: Vec::new(),
            llm_provider: None,
            llm_model: None,
        }
    }
}

/// Fields passed through to content generation untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub city: Option<String>,
    pub language: Option<String>,
    pub content_tone: Option<String>,
    pub character_tones: Vec<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
}

/// A [`DeviceConfig`] after defaulting: `modes` is parsed and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub modes: Vec<Persona>,
    pub refresh_interval_minutes: u32,
    pub strategy: RefreshStrategy,
    pub profile: DeviceProfile,
}

impl EffectiveConfig {
    pub fn from_config(config: &DeviceConfig) -> Self {
        let mut modes: Vec<Persona> = config
            .modes
            .iter()
            .filter_map(|mode| mode.parse().ok())
            .collect();
        if modes.is_empty() {
            modes = DEFAULT_MODES.to_vec();
        }

        Self {
            modes,
            refresh_interval_minutes: config.refresh_interval,
            strategy: config.refresh_strategy,
            profile: DeviceProfile {
                city: non_blank(config.city.as_deref()),
                language: non_blank(config.language.as_deref()),
                content_tone: non_blank(config.content_tone.as_deref()),
                character_tones: config.character_tones.clone(),
                llm_provider: non_blank(config.llm_provider.as_deref()),
                llm_model: non_blank(config.llm_model.as_deref()),
            },
        }
    }

    /// Configured modes eligible for caching, in configured order.
    pub fn cacheable_modes(&self) -> Vec<Persona> {
        self.modes
            .iter()
            .copied()
            .filter(|persona| persona.is_cacheable())
            .collect()
    }

    pub fn city(&self) -> Option<&str> {
        self.profile.city.as_deref()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> DeviceKey {
        DeviceKey::parse("AA:BB:CC:DD:EE:FF").expect("device key")
    }

    #[test]
    fn blank_device_key_is_absent() {
        assert!(DeviceKey::parse("").is_none());
        assert!(DeviceKey::parse("   ").is_none());
        assert_eq!(key().as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn blank_device_key_is_rejected_on_deserialize() {
        let err = serde_json::from_str::<DeviceConfig>(r#"{"mac":"  "}"#);
        assert!(err.is_err());

        let config: DeviceConfig = serde_json::from_str(r#"{"mac":" A1 "}"#).expect("config");
        assert_eq!(config.mac.as_str(), "A1");
    }

    #[test]
    fn empty_modes_fall_back_to_defaults() {
        let config = DeviceConfig::new(key());
        let effective = EffectiveConfig::from_config(&config);
        assert_eq!(effective.modes, DEFAULT_MODES.to_vec());
    }

    #[test]
    fn unknown_modes_are_dropped_and_known_ones_keep_order() {
        let mut config = DeviceConfig::new(key());
        config.modes = vec!["zen".into(), "HAIKU".into(), "Stoic".into(), "ERROR".into()];
        let effective = EffectiveConfig::from_config(&config);
        assert_eq!(
            effective.modes,
            vec![Persona::Zen, Persona::Stoic, Persona::Error]
        );
        assert_eq!(effective.cacheable_modes(), vec![Persona::Zen, Persona::Stoic]);
    }

    #[test]
    fn only_unknown_modes_fall_back_to_defaults() {
        let mut config = DeviceConfig::new(key());
        config.modes = vec!["HAIKU".into()];
        let effective = EffectiveConfig::from_config(&config);
        assert_eq!(effective.modes, DEFAULT_MODES.to_vec());
    }

    #[test]
    fn unrecognised_strategy_deserializes_as_random() {
        let json = r#"{"mac":"A1","modes":["ZEN"],"refresh_strategy":"shuffle"}"#;
        let config: DeviceConfig = serde_json::from_str(json).expect("config");
        assert_eq!(config.refresh_strategy, RefreshStrategy::Random);
        assert_eq!(config.refresh_interval, DEFAULT_REFRESH_INTERVAL_MINUTES);

        let json = r#"{"mac":"A1","refresh_strategy":"cycle","refresh_interval":15}"#;
        let config: DeviceConfig = serde_json::from_str(json).expect("config");
        assert_eq!(config.refresh_strategy, RefreshStrategy::Cycle);
        assert_eq!(config.refresh_interval, 15);
    }

    #[test]
    fn blank_profile_fields_are_normalised_away() {
        let mut config = DeviceConfig::new(key());
        config.city = Some("  ".into());
        config.llm_model = Some(" deepseek-chat ".into());
        let effective = EffectiveConfig::from_config(&config);
        assert_eq!(effective.city(), None);
        assert_eq!(effective.profile.llm_model.as_deref(), Some("deepseek-chat"));
    }
}
