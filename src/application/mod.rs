//! Orchestration core: persona selection, cache warm-up and per-poll artifact production.

pub mod context;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod regenerate;
pub mod request;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;
