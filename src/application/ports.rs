//! Traits describing the collaborators the orchestrators call out to.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::context::{DateContext, SharedContext, WeatherContext};
use crate::domain::artifact::Artifact;
use crate::domain::device::{DeviceConfig, DeviceKey, DeviceProfile};
use crate::domain::persona::Persona;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("content provider request failed: {0}")]
    Provider(String),
    #[error("content provider returned malformed content: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template rendering failed: {0}")]
    Template(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid device config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context request failed: {0}")]
    Request(String),
    #[error("context provider returned malformed data: {0}")]
    Malformed(String),
}

/// Generated content for one persona: a flat map of named fields whose shape depends on the
/// persona (e.g. `quote` + `author` for STOIC, `word` for ZEN).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PersonaContent(Map<String, Value>);

impl PersonaContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts only JSON objects.
    pub fn from_value(value: Value) -> Result<Self, GenerationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(GenerationError::Malformed(format!(
                "expected an object, got `{other}`"
            ))),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn number(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    /// String items of an array field; non-string items are skipped.
    pub fn texts(&self, field: &str) -> Vec<&str> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(|value| !value.is_null())
    }
}

/// Produces persona content, typically by calling a language model.
///
/// Implementations fail on provider or network errors and never return partial content.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(
        &self,
        persona: Persona,
        context: &SharedContext,
        profile: &DeviceProfile,
    ) -> Result<PersonaContent, GenerationError>;
}

/// Draws generated content into a display artifact.
pub trait RenderPort: Send + Sync {
    fn render(
        &self,
        persona: Persona,
        content: &PersonaContent,
        context: &SharedContext,
        battery_percent: u8,
    ) -> Result<Artifact, RenderError>;

    /// Diagnostic card shown when no content could be produced.
    fn render_unavailable(
        &self,
        device: Option<&DeviceKey>,
        voltage: f64,
    ) -> Result<Artifact, RenderError>;
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn active_config(&self, device: &DeviceKey) -> Result<Option<DeviceConfig>, StoreError>;
}

/// One stored version of a device's configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigRecord {
    pub id: u64,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(flatten)]
    pub config: DeviceConfig,
}

#[async_trait]
pub trait ConfigWriteStore: ConfigStore {
    /// Store a new version and make it the active one. Returns its id.
    async fn save(&self, config: DeviceConfig) -> Result<u64, StoreError>;

    /// All versions for `device`, newest first.
    async fn history(&self, device: &DeviceKey) -> Result<Vec<ConfigRecord>, StoreError>;

    /// Make version `id` active. Returns `false` when it does not exist for `device`.
    async fn activate(&self, device: &DeviceKey, id: u64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn date_context(&self) -> Result<DateContext, ContextError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn weather(&self, city: Option<&str>) -> Result<WeatherContext, ContextError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_accessors_read_typed_fields() {
        let content = PersonaContent::from_value(json!({
            "quote": "Waste no more time arguing what a good man should be.",
            "author": "Marcus Aurelius",
            "days": 12,
            "items": ["one", 2, "three"],
            "missing": null,
        }))
        .expect("object content");

        assert_eq!(content.text("author"), Some("Marcus Aurelius"));
        assert_eq!(content.number("days"), Some(12));
        assert_eq!(content.texts("items"), vec!["one", "three"]);
        assert!(content.has("quote"));
        assert!(!content.has("missing"));
        assert!(!content.has("absent"));
    }

    #[test]
    fn non_object_content_is_malformed() {
        let err = PersonaContent::from_value(json!(["quote"])).expect_err("array rejected");
        assert!(matches!(err, GenerationError::Malformed(_)));
    }
}
