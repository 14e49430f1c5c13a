//! Per-poll entry point: pick a persona, serve it from cache or produce it on demand.

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{debug, info};

use crate::application::context::ContextGatherer;
use crate::application::error::AppError;
use crate::application::pipeline::RenderPipeline;
use crate::application::ports::{
    CalendarProvider, ConfigStore, GenerationPort, RenderPort, WeatherProvider,
};
use crate::application::regenerate::RegenerationOrchestrator;
use crate::application::resolver::PersonaResolver;
use crate::cache::{CacheConfig, ContentCache};
use crate::domain::artifact::Artifact;
use crate::domain::battery::{DEFAULT_FULL_VOLTAGE, battery_percent};
use crate::domain::device::{DeviceKey, EffectiveConfig};
use crate::domain::persona::Persona;

/// External collaborators the orchestrators depend on.
#[derive(Clone)]
pub struct Ports {
    pub store: Arc<dyn ConfigStore>,
    pub generator: Arc<dyn GenerationPort>,
    pub renderer: Arc<dyn RenderPort>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub weather: Arc<dyn WeatherProvider>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub cache: CacheConfig,
    pub full_voltage: f64,
    /// Zone used for placeholder dates when the calendar provider fails.
    pub timezone: Tz,
}

pub struct RequestOrchestrator {
    store: Arc<dyn ConfigStore>,
    resolver: Arc<PersonaResolver>,
    cache: Arc<ContentCache>,
    regeneration: RegenerationOrchestrator,
    pipeline: RenderPipeline,
    context: Arc<ContextGatherer>,
    full_voltage: f64,
}

impl RequestOrchestrator {
    /// Wire the orchestrators around a fresh cache and resolver.
    pub fn assemble(ports: Ports, options: OrchestratorOptions) -> Self {
        let cache = Arc::new(ContentCache::new());
        let resolver = Arc::new(PersonaResolver::new());
        let context = Arc::new(ContextGatherer::new(
            ports.calendar,
            ports.weather,
            options.timezone,
        ));
        let pipeline = RenderPipeline::new(ports.generator, ports.renderer);
        let regeneration = RegenerationOrchestrator::new(
            Arc::clone(&cache),
            pipeline.clone(),
            Arc::clone(&context),
            &options.cache,
            options.full_voltage,
        );

        Self {
            store: ports.store,
            resolver,
            cache,
            regeneration,
            pipeline,
            context,
            full_voltage: options.full_voltage,
        }
    }

    /// Produce the artifact for one device poll.
    ///
    /// Failures of the on-demand generation surface as [`AppError`]; callers substitute the
    /// diagnostic card from [`RenderPort::render_unavailable`].
    pub async fn build_artifact(
        &self,
        voltage: f64,
        device: Option<&DeviceKey>,
        requested: Option<&str>,
    ) -> Result<Artifact, AppError> {
        let battery = battery_percent(voltage, self.full_voltage);

        let config = match device {
            Some(device) => self
                .store
                .active_config(device)
                .await?
                .map(|config| EffectiveConfig::from_config(&config)),
            None => None,
        };

        let persona = self
            .resolver
            .resolve(device, config.as_ref(), requested, false);

        let warm = device.zip(config.as_ref());
        if let Some((device, config)) = warm {
            self.regeneration.ensure_warm(device, config, voltage).await;
            if let Some(artifact) = self.cache.get(device, persona, config, None) {
                debug!(
                    target = "inkcast::request",
                    device = %device,
                    persona = persona.as_str(),
                    "serving cached artifact"
                );
                return Ok(artifact);
            }
        }

        info!(
            target = "inkcast::request",
            device = device.map(DeviceKey::as_str).unwrap_or(""),
            persona = persona.as_str(),
            configured = config.is_some(),
            "generating on demand"
        );

        let profile = config
            .as_ref()
            .map(|config| config.profile.clone())
            .unwrap_or_default();
        let city = profile.city.clone();
        let context = self.context.gather(city.as_deref()).await;
        let artifact = self
            .pipeline
            .produce(persona, &context, &profile, battery)
            .await?;

        if let Some((device, _)) = warm
            && persona.is_cacheable()
        {
            self.cache.set(device, persona, artifact.clone());
        }

        Ok(artifact)
    }

    /// Diagnostic artifact for a poll that could not be served.
    pub fn unavailable_artifact(
        &self,
        device: Option<&DeviceKey>,
        voltage: f64,
    ) -> Result<Artifact, AppError> {
        self.pipeline
            .renderer()
            .render_unavailable(device, voltage)
            .map_err(|source| AppError::Render {
                persona: Persona::Error,
                source,
            })
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<PersonaResolver> {
        &self.resolver
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            full_voltage: DEFAULT_FULL_VOLTAGE,
            timezone: Tz::UTC,
        }
    }
}
