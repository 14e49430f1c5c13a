//! Infrastructure adapters and runtime bootstrap.

use std::time::Duration;

use reqwest::Client;

pub mod context;
pub mod error;
pub mod generation;
pub mod http;
pub mod store;
pub mod telemetry;

use error::InfraError;

/// Outbound HTTP client shared by the context and generation adapters.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, InfraError> {
    Ok(Client::builder()
        .user_agent(concat!("inkcast/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}
