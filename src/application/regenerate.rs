//! Batch warm-up of every cacheable persona for one device.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::application::context::ContextGatherer;
use crate::application::error::AppError;
use crate::application::pipeline::RenderPipeline;
use crate::cache::{CacheConfig, ContentCache, InFlightBatches, Ttl};
use crate::domain::battery::battery_percent;
use crate::domain::device::{DeviceKey, EffectiveConfig};
use crate::domain::persona::Persona;

pub(crate) const METRIC_BATCH_OK: &str = "inkcast_batch_persona_ok_total";
pub(crate) const METRIC_BATCH_FAILED: &str = "inkcast_batch_persona_failed_total";
pub(crate) const METRIC_BATCH_MS: &str = "inkcast_batch_ms";

pub struct RegenerationOrchestrator {
    cache: Arc<ContentCache>,
    pipeline: RenderPipeline,
    context: Arc<ContextGatherer>,
    batches: Option<InFlightBatches>,
    full_voltage: f64,
}

impl RegenerationOrchestrator {
    pub fn new(
        cache: Arc<ContentCache>,
        pipeline: RenderPipeline,
        context: Arc<ContextGatherer>,
        config: &CacheConfig,
        full_voltage: f64,
    ) -> Self {
        Self {
            cache,
            pipeline,
            context,
            batches: config.coalesce_batches.then(InFlightBatches::new),
            full_voltage,
        }
    }

    #[cfg(test)]
    pub(crate) fn batches(&self) -> Option<&InFlightBatches> {
        self.batches.as_ref()
    }

    /// Make sure every cacheable configured persona has a fresh entry for `device`.
    ///
    /// Returns `false` only when there is nothing to warm, or when batch coalescing is enabled
    /// and another batch for the device is already running. Individual persona failures are
    /// logged and leave their slot empty; they never fail the batch.
    pub async fn ensure_warm(
        &self,
        device: &DeviceKey,
        config: &EffectiveConfig,
        voltage: f64,
    ) -> bool {
        let modes = config.cacheable_modes();
        if modes.is_empty() {
            return false;
        }

        let ttl = Ttl::for_config(config);
        let Some(first_miss) = modes
            .iter()
            .copied()
            .find(|persona| self.cache.get(device, *persona, config, Some(ttl)).is_none())
        else {
            return true;
        };

        let _guard = match &self.batches {
            Some(batches) => match batches.acquire(device) {
                Ok(guard) => Some(guard),
                Err(error) => {
                    debug!(
                        target = "inkcast::regenerate",
                        error = %error,
                        "skipping warm-up batch"
                    );
                    return false;
                }
            },
            None => None,
        };

        info!(
            target = "inkcast::regenerate",
            device = %device,
            first_miss = first_miss.as_str(),
            personas = modes.len(),
            ttl_minutes = ttl.minutes(),
            "warming device cache"
        );

        let started = Instant::now();
        let context = self.context.gather(config.city()).await;
        let battery = battery_percent(voltage, self.full_voltage);

        let tasks = modes.iter().copied().map(|persona| {
            let context = &context;
            async move {
                let outcome = self
                    .pipeline
                    .produce(persona, context, &config.profile, battery)
                    .await
                    .map(|artifact| self.cache.set(device, persona, artifact));
                (persona, outcome)
            }
        });
        let outcomes: Vec<(Persona, Result<(), AppError>)> = join_all(tasks).await;

        let mut succeeded = 0usize;
        for (persona, outcome) in &outcomes {
            match outcome {
                Ok(()) => {
                    succeeded += 1;
                    counter!(METRIC_BATCH_OK).increment(1);
                }
                Err(error) => {
                    counter!(METRIC_BATCH_FAILED).increment(1);
                    warn!(
                        target = "inkcast::regenerate",
                        device = %device,
                        persona = persona.as_str(),
                        error = %error,
                        "persona generation failed"
                    );
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis();
        histogram!(METRIC_BATCH_MS).record(elapsed_ms as f64);
        info!(
            target = "inkcast::regenerate",
            device = %device,
            succeeded,
            total = outcomes.len(),
            elapsed_ms,
            "warm-up batch finished"
        );

        true
    }
}
