//! Chooses which persona a device shows next.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::domain::device::{DeviceKey, EffectiveConfig, RefreshStrategy};
use crate::domain::persona::{DEFAULT_MODES, FALLBACK_PERSONAS, Persona};
use crate::util::sync::mutex_lock;

const SOURCE: &str = "application::resolver";

/// Selects personas and keeps the per-device round-robin position.
///
/// Positions live in memory only and restart at zero after a restart. A device key absent
/// from the map is at position zero. Configured polls without a device key share the `None`
/// slot.
#[derive(Default)]
pub struct PersonaResolver {
    positions: Mutex<HashMap<Option<DeviceKey>, u64>>,
}

impl PersonaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the persona to serve.
    ///
    /// A supported `requested` persona always wins. Otherwise the configured strategy picks
    /// from the configured modes, and an unconfigured device gets a uniform pick from the
    /// fallback set. With `peek`, a cycle position is read but not advanced.
    pub fn resolve(
        &self,
        device: Option<&DeviceKey>,
        config: Option<&EffectiveConfig>,
        requested: Option<&str>,
        peek: bool,
    ) -> Persona {
        if let Some(persona) = requested.and_then(Persona::parse_override) {
            debug!(
                target = "inkcast::resolver",
                persona = persona.as_str(),
                "using requested persona"
            );
            return persona;
        }

        let Some(config) = config else {
            return choose(&FALLBACK_PERSONAS);
        };

        match config.strategy {
            RefreshStrategy::Cycle => self.next_in_cycle(device, &config.modes, peek),
            RefreshStrategy::Random => choose(&config.modes),
        }
    }

    /// Current cycle position for `device`; zero when it has never advanced.
    pub fn position(&self, device: &DeviceKey) -> u64 {
        mutex_lock(&self.positions, SOURCE, "position")
            .get(&Some(device.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn next_in_cycle(&self, device: Option<&DeviceKey>, modes: &[Persona], peek: bool) -> Persona {
        let modes = if modes.is_empty() {
            &DEFAULT_MODES[..]
        } else {
            modes
        };
        let slot = device.cloned();

        let mut positions = mutex_lock(&self.positions, SOURCE, "next_in_cycle");
        let position = positions.get(&slot).copied().unwrap_or(0);
        let persona = modes[(position % modes.len() as u64) as usize];
        if !peek {
            positions.insert(slot, position.wrapping_add(1));
        }
        drop(positions);

        debug!(
            target = "inkcast::resolver",
            device = device.map(DeviceKey::as_str).unwrap_or(""),
            position,
            persona = persona.as_str(),
            peek,
            "cycle step"
        );
        persona
    }
}

fn choose(candidates: &[Persona]) -> Persona {
    // rand's thread-local generator is not `Send`; keep it inside this synchronous scope.
    let mut rng = rand::thread_rng();
    candidates
        .choose(&mut rng)
        .copied()
        .unwrap_or(DEFAULT_MODES[0])
}
