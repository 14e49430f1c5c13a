//! Small helpers shared across layers.

pub(crate) mod sync;
pub mod timezone;
