//! In-memory port implementations for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::TimeZone;
use chrono_tz::Tz;

use crate::application::context::{ContextGatherer, DateContext, SharedContext, WeatherContext};
use crate::application::ports::{
    CalendarProvider, ConfigStore, ContextError, GenerationError, GenerationPort, PersonaContent,
    RenderError, RenderPort, StoreError, WeatherProvider,
};
use crate::domain::artifact::{Artifact, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::domain::device::{DeviceConfig, DeviceKey, DeviceProfile};
use crate::domain::persona::Persona;

/// Records every call; personas listed as failing return a provider error.
#[derive(Default)]
pub(crate) struct FakeGenerator {
    calls: Mutex<Vec<Persona>>,
    failing: HashSet<Persona>,
}

impl FakeGenerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(personas: impl IntoIterator<Item = Persona>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: personas.into_iter().collect(),
        }
    }

    pub(crate) fn calls_for(&self, persona: Persona) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|called| **called == persona)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl GenerationPort for FakeGenerator {
    async fn generate(
        &self,
        persona: Persona,
        _context: &SharedContext,
        _profile: &DeviceProfile,
    ) -> Result<PersonaContent, GenerationError> {
        self.calls.lock().expect("calls lock").push(persona);
        tokio::task::yield_now().await;
        if self.failing.contains(&persona) {
            return Err(GenerationError::Provider(format!("{persona} refused")));
        }
        Ok(PersonaContent::new().with("persona", persona.as_str()))
    }
}

/// Body is `PERSONA@battery`, which lets tests tell artifacts apart.
pub(crate) struct FakeRenderer;

impl RenderPort for FakeRenderer {
    fn render(
        &self,
        persona: Persona,
        _content: &PersonaContent,
        _context: &SharedContext,
        battery_percent: u8,
    ) -> Result<Artifact, RenderError> {
        Ok(artifact(persona, format!("{persona}@{battery_percent}")))
    }

    fn render_unavailable(
        &self,
        _device: Option<&DeviceKey>,
        _voltage: f64,
    ) -> Result<Artifact, RenderError> {
        Ok(artifact(Persona::Error, "unavailable".to_string()))
    }
}

fn artifact(persona: Persona, body: String) -> Artifact {
    Artifact {
        persona,
        width: SCREEN_WIDTH,
        height: SCREEN_HEIGHT,
        media_type: "text/plain",
        body: Bytes::from(body),
    }
}

pub(crate) struct FixedCalendar;

#[async_trait]
impl CalendarProvider for FixedCalendar {
    async fn date_context(&self) -> Result<DateContext, ContextError> {
        let now = Tz::UTC
            .with_ymd_and_hms(2025, 2, 14, 8, 30, 0)
            .single()
            .ok_or_else(|| ContextError::Malformed("fixed timestamp".into()))?;
        Ok(DateContext::bare(now))
    }
}

pub(crate) struct FixedWeather;

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn weather(&self, _city: Option<&str>) -> Result<WeatherContext, ContextError> {
        Ok(WeatherContext::new(12, 3))
    }
}

pub(crate) fn fixed_context() -> ContextGatherer {
    ContextGatherer::new(Arc::new(FixedCalendar), Arc::new(FixedWeather), Tz::UTC)
}

#[derive(Default)]
pub(crate) struct MapStore {
    configs: Mutex<HashMap<DeviceKey, DeviceConfig>>,
}

impl MapStore {
    pub(crate) fn with(configs: impl IntoIterator<Item = DeviceConfig>) -> Self {
        Self {
            configs: Mutex::new(
                configs
                    .into_iter()
                    .map(|config| (config.mac.clone(), config))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ConfigStore for MapStore {
    async fn active_config(&self, device: &DeviceKey) -> Result<Option<DeviceConfig>, StoreError> {
        Ok(self.configs.lock().expect("configs lock").get(device).cloned())
    }
}

/// Store whose lookups always fail.
pub(crate) struct BrokenStore;

#[async_trait]
impl ConfigStore for BrokenStore {
    async fn active_config(&self, _device: &DeviceKey) -> Result<Option<DeviceConfig>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}
