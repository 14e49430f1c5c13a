//! Domain layer types and invariants.

pub mod artifact;
pub mod battery;
pub mod device;
pub mod persona;
