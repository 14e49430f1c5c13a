//! Two-stage production of one persona: generate its content, then render the card.

use std::sync::Arc;

use tracing::debug;

use crate::application::context::SharedContext;
use crate::application::error::AppError;
use crate::application::ports::{GenerationPort, RenderPort};
use crate::domain::artifact::Artifact;
use crate::domain::device::DeviceProfile;
use crate::domain::persona::Persona;

/// Generate-then-render for a single persona.
#[derive(Clone)]
pub struct RenderPipeline {
    generator: Arc<dyn GenerationPort>,
    renderer: Arc<dyn RenderPort>,
}

impl RenderPipeline {
    pub fn new(generator: Arc<dyn GenerationPort>, renderer: Arc<dyn RenderPort>) -> Self {
        Self {
            generator,
            renderer,
        }
    }

    pub async fn produce(
        &self,
        persona: Persona,
        context: &SharedContext,
        profile: &DeviceProfile,
        battery_percent: u8,
    ) -> Result<Artifact, AppError> {
        let content = self
            .generator
            .generate(persona, context, profile)
            .await
            .map_err(|source| AppError::Generation { persona, source })?;

        let artifact = self
            .renderer
            .render(persona, &content, context, battery_percent)
            .map_err(|source| AppError::Render { persona, source })?;

        debug!(
            target = "inkcast::pipeline",
            persona = persona.as_str(),
            bytes = artifact.len(),
            "artifact produced"
        );
        Ok(artifact)
    }

    pub fn renderer(&self) -> &Arc<dyn RenderPort> {
        &self.renderer
    }
}
