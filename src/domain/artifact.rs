use bytes::Bytes;

use super::persona::Persona;

/// Display width of the supported e-ink panel, in pixels.
pub const SCREEN_WIDTH: u32 = 400;
/// Display height of the supported e-ink panel, in pixels.
pub const SCREEN_HEIGHT: u32 = 300;

/// A rendered, ready-to-serve display image.
///
/// Cloning is cheap: the encoded body is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub persona: Persona,
    pub width: u32,
    pub height: u32,
    pub media_type: &'static str,
    pub body: Bytes,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
