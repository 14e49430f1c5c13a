//! Persona (display mode) identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One content template + style a device can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Persona {
    Stoic,
    Roast,
    Zen,
    Daily,
    Briefing,
    Artwall,
    Recipe,
    Fitness,
    Poetry,
    Countdown,
    /// Diagnostic card drawn when the service cannot produce content.
    Error,
}

/// Mode sequence used when a device config names no usable personas.
pub const DEFAULT_MODES: [Persona; 4] =
    [Persona::Stoic, Persona::Roast, Persona::Zen, Persona::Daily];

/// Personas drawn from when the polling device is not registered.
///
/// Kept apart from [`DEFAULT_MODES`] on purpose; the two lists may diverge.
pub const FALLBACK_PERSONAS: [Persona; 4] =
    [Persona::Stoic, Persona::Roast, Persona::Zen, Persona::Daily];

impl Persona {
    pub const ALL: [Persona; 11] = [
        Persona::Stoic,
        Persona::Roast,
        Persona::Zen,
        Persona::Daily,
        Persona::Briefing,
        Persona::Artwall,
        Persona::Recipe,
        Persona::Fitness,
        Persona::Poetry,
        Persona::Countdown,
        Persona::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Stoic => "STOIC",
            Persona::Roast => "ROAST",
            Persona::Zen => "ZEN",
            Persona::Daily => "DAILY",
            Persona::Briefing => "BRIEFING",
            Persona::Artwall => "ARTWALL",
            Persona::Recipe => "RECIPE",
            Persona::Fitness => "FITNESS",
            Persona::Poetry => "POETRY",
            Persona::Countdown => "COUNTDOWN",
            Persona::Error => "ERROR",
        }
    }

    /// Whether a caller may request this persona explicitly.
    pub fn is_supported(self) -> bool {
        !matches!(self, Persona::Error)
    }

    /// Whether rendered artifacts for this persona may be kept in the content cache.
    pub fn is_cacheable(self) -> bool {
        !matches!(self, Persona::Error)
    }

    /// Parse a caller-supplied override. Only supported personas are accepted.
    pub fn parse_override(value: &str) -> Option<Self> {
        value.parse().ok().filter(|persona: &Persona| persona.is_supported())
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown persona `{0}`")]
pub struct UnknownPersona(pub String);

impl FromStr for Persona {
    type Err = UnknownPersona;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Persona::ALL
            .into_iter()
            .find(|persona| persona.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownPersona(value.to_string()))
    }
}
