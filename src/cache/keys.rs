//! Cache key definitions.

use crate::domain::device::DeviceKey;
use crate::domain::persona::Persona;

/// Identifies one cache slot: the rendered artifact of one persona for one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub device: DeviceKey,
    pub persona: Persona,
}

impl CacheKey {
    pub fn new(device: &DeviceKey, persona: Persona) -> Self {
        Self {
            device: device.clone(),
            persona,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.device, self.persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_device_and_persona() {
        let device = DeviceKey::parse("A1:B2").expect("device key");
        let key = CacheKey::new(&device, Persona::Zen);
        assert_eq!(key.to_string(), "A1:B2:ZEN");
    }

    #[test]
    fn keys_differ_per_persona() {
        let device = DeviceKey::parse("A1:B2").expect("device key");
        assert_ne!(
            CacheKey::new(&device, Persona::Zen),
            CacheKey::new(&device, Persona::Stoic)
        );
    }
}
