//! In-process, versioned device configuration store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use crate::application::ports::{ConfigRecord, ConfigStore, ConfigWriteStore, StoreError};
use crate::domain::device::{DeviceConfig, DeviceKey};
use crate::infra::error::InfraError;
use crate::util::sync::mutex_lock;

const SOURCE: &str = "infra::store";

struct StoredConfig {
    id: u64,
    created_at: OffsetDateTime,
    config: DeviceConfig,
}

#[derive(Default)]
struct StoreState {
    next_id: u64,
    versions: HashMap<DeviceKey, Vec<StoredConfig>>,
    active: HashMap<DeviceKey, u64>,
}

/// Keeps every saved version of each device's configuration; exactly one is active.
///
/// Contents live for the process lifetime. A TOML seed file can preload configurations at
/// start-up:
///
/// ```toml
/// [[devices]]
/// mac = "AA:BB:CC:DD:EE:FF"
/// modes = ["STOIC", "ZEN"]
/// refresh_strategy = "cycle"
/// refresh_interval = 30
/// ```
#[derive(Default)]
pub struct MemoryConfigStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse seed TOML and store each listed config as that device's active version.
    pub fn from_seed_toml(contents: &str) -> Result<Self, InfraError> {
        let seed: SeedFile = toml::from_str(contents)
            .map_err(|err| InfraError::configuration(format!("invalid device seed: {err}")))?;

        let store = Self::new();
        for config in seed.devices {
            store.insert(config).map_err(|err| {
                InfraError::configuration(format!("invalid device seed entry: {err}"))
            })?;
        }
        Ok(store)
    }

    pub async fn from_seed_file(path: &Path) -> Result<Self, InfraError> {
        let contents = tokio::fs::read_to_string(path).await?;
        let store = Self::from_seed_toml(&contents)?;
        info!(
            target = "inkcast::store",
            path = %path.display(),
            devices = store.device_count(),
            "loaded device seed"
        );
        Ok(store)
    }

    pub fn device_count(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "device_count").active.len()
    }

    fn insert(&self, config: DeviceConfig) -> Result<u64, StoreError> {
        if config.refresh_interval == 0 {
            return Err(StoreError::Invalid(
                "refresh_interval must be at least one minute".into(),
            ));
        }

        let mut state = mutex_lock(&self.state, SOURCE, "insert");
        state.next_id += 1;
        let id = state.next_id;
        let device = config.mac.clone();
        state
            .versions
            .entry(device.clone())
            .or_default()
            .push(StoredConfig {
                id,
                created_at: OffsetDateTime::now_utc(),
                config,
            });
        state.active.insert(device, id);
        Ok(id)
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn active_config(&self, device: &DeviceKey) -> Result<Option<DeviceConfig>, StoreError> {
        let state = mutex_lock(&self.state, SOURCE, "active_config");
        let Some(active) = state.active.get(device).copied() else {
            return Ok(None);
        };
        Ok(state.versions.get(device).and_then(|versions| {
            versions
                .iter()
                .find(|stored| stored.id == active)
                .map(|stored| stored.config.clone())
        }))
    }
}

#[async_trait]
impl ConfigWriteStore for MemoryConfigStore {
    async fn save(&self, config: DeviceConfig) -> Result<u64, StoreError> {
        let device = config.mac.clone();
        let id = self.insert(config)?;
        info!(
            target = "inkcast::store",
            device = %device,
            config_id = id,
            "saved device config"
        );
        Ok(id)
    }

    async fn history(&self, device: &DeviceKey) -> Result<Vec<ConfigRecord>, StoreError> {
        let state = mutex_lock(&self.state, SOURCE, "history");
        let active = state.active.get(device).copied();
        let records = state
            .versions
            .get(device)
            .map(|versions| {
                versions
                    .iter()
                    .rev()
                    .map(|stored| ConfigRecord {
                        id: stored.id,
                        active: Some(stored.id) == active,
                        created_at: stored.created_at,
                        config: stored.config.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    async fn activate(&self, device: &DeviceKey, id: u64) -> Result<bool, StoreError> {
        let mut state = mutex_lock(&self.state, SOURCE, "activate");
        let known = state
            .versions
            .get(device)
            .is_some_and(|versions| versions.iter().any(|stored| stored.id == id));
        if known {
            state.active.insert(device.clone(), id);
        }
        Ok(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::RefreshStrategy;

    fn device() -> DeviceKey {
        DeviceKey::parse("AA:BB:CC:DD:EE:30").expect("device key")
    }

    fn config(modes: &[&str]) -> DeviceConfig {
        let mut config = DeviceConfig::new(device());
        config.modes = modes.iter().map(|mode| mode.to_string()).collect();
        config
    }

    #[tokio::test]
    async fn newest_save_becomes_active() {
        let store = MemoryConfigStore::new();

        let first = store.save(config(&["STOIC"])).await.expect("save");
        let second = store.save(config(&["ZEN"])).await.expect("save");
        assert!(second > first);

        let active = store
            .active_config(&device())
            .await
            .expect("lookup")
            .expect("active config");
        assert_eq!(active.modes, vec!["ZEN".to_string()]);
    }

    #[tokio::test]
    async fn history_is_newest_first_with_one_active_entry() {
        let store = MemoryConfigStore::new();
        store.save(config(&["STOIC"])).await.expect("save");
        store.save(config(&["ZEN"])).await.expect("save");

        let history = store.history(&device()).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].config.modes, vec!["ZEN".to_string()]);
        assert!(history[0].active);
        assert!(!history[1].active);
    }

    #[tokio::test]
    async fn activate_restores_an_earlier_version() {
        let store = MemoryConfigStore::new();
        let first = store.save(config(&["STOIC"])).await.expect("save");
        store.save(config(&["ZEN"])).await.expect("save");

        assert!(store.activate(&device(), first).await.expect("activate"));
        let active = store
            .active_config(&device())
            .await
            .expect("lookup")
            .expect("active config");
        assert_eq!(active.modes, vec!["STOIC".to_string()]);

        assert!(!store.activate(&device(), 999).await.expect("activate"));
        let other = DeviceKey::parse("11:22:33:44:55:66").expect("device key");
        assert!(!store.activate(&other, first).await.expect("activate"));
    }

    #[tokio::test]
    async fn unknown_device_has_no_config() {
        let store = MemoryConfigStore::new();
        assert!(store.active_config(&device()).await.expect("lookup").is_none());
        assert!(store.history(&device()).await.expect("history").is_empty());
    }

    #[tokio::test]
    async fn zero_refresh_interval_is_rejected() {
        let store = MemoryConfigStore::new();
        let mut config = config(&["STOIC"]);
        config.refresh_interval = 0;

        let err = store.save(config).await.expect_err("invalid interval");
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn seed_toml_preloads_devices() {
        let store = MemoryConfigStore::from_seed_toml(
            r#"
            [[devices]]
            mac = "AA:BB:CC:DD:EE:30"
            modes = ["STOIC", "ZEN"]
            refresh_strategy = "cycle"
            refresh_interval = 30
            city = "Lisbon"

            [[devices]]
            mac = "11:22:33:44:55:66"
            "#,
        )
        .expect("seed");

        assert_eq!(store.device_count(), 2);
        let active = store
            .active_config(&device())
            .await
            .expect("lookup")
            .expect("seeded config");
        assert_eq!(active.refresh_strategy, RefreshStrategy::Cycle);
        assert_eq!(active.refresh_interval, 30);
        assert_eq!(active.city.as_deref(), Some("Lisbon"));
    }

    #[test]
    fn malformed_seed_is_a_configuration_error() {
        let err = MemoryConfigStore::from_seed_toml("[[devices]]\nmodes = 3")
            .err()
            .expect("malformed seed");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }

    #[tokio::test]
    async fn seed_file_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        std::io::Write::write_all(
            &mut file,
            b"[[devices]]\nmac = \"AA:BB:CC:DD:EE:30\"\nmodes = [\"ZEN\"]\n",
        )
        .expect("write seed");

        let store = MemoryConfigStore::from_seed_file(file.path())
            .await
            .expect("seed file");
        assert_eq!(store.device_count(), 1);
    }
}
