//! Display rendering: askama SVG cards sized for the e-ink panel.

pub mod cards;
mod layout;

pub use cards::SvgCardRenderer;
pub use layout::wrap_text;
