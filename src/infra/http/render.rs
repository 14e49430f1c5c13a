use axum::{
    extract::{Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::application::error::{AppError, ErrorReport};
use crate::domain::artifact::Artifact;
use crate::domain::battery::DEFAULT_REPORTED_VOLTAGE;
use crate::domain::device::DeviceKey;

use super::HttpState;

const SOURCE: &str = "infra::http::render";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RenderQuery {
    /// Battery voltage; unparsable readings count as absent.
    v: Option<String>,
    mac: Option<String>,
    persona: Option<String>,
}

impl RenderQuery {
    fn voltage(&self) -> f64 {
        self.v
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|volts| volts.is_finite())
            .unwrap_or(DEFAULT_REPORTED_VOLTAGE)
    }
}

pub(super) async fn render(
    State(state): State<HttpState>,
    Query(query): Query<RenderQuery>,
) -> Response {
    serve_poll(&state, &query).await
}

/// Browser preview of the card a device would receive for the same query.
pub(super) async fn preview(
    State(state): State<HttpState>,
    Query(query): Query<RenderQuery>,
) -> Response {
    let mut response = serve_poll(&state, &query).await;
    response
        .headers_mut()
        .insert(CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    response
}

async fn serve_poll(state: &HttpState, query: &RenderQuery) -> Response {
    let voltage = query.voltage();
    let device = query.mac.as_deref().and_then(DeviceKey::parse);

    let result = state
        .orchestrator
        .build_artifact(voltage, device.as_ref(), query.persona.as_deref())
        .await;

    match result {
        Ok(artifact) => artifact_response(StatusCode::OK, artifact),
        Err(err) => error_card(state, device.as_ref(), voltage, err),
    }
}

/// The device always receives something drawable; the failure itself travels in the report.
fn error_card(
    state: &HttpState,
    device: Option<&DeviceKey>,
    voltage: f64,
    err: AppError,
) -> Response {
    let report = ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err);
    match state.orchestrator.unavailable_artifact(device, voltage) {
        Ok(card) => {
            let mut response = artifact_response(StatusCode::INTERNAL_SERVER_ERROR, card);
            report.attach(&mut response);
            response
        }
        Err(card_err) => {
            let mut response = card_err.into_response();
            report.attach(&mut response);
            response
        }
    }
}

fn artifact_response(status: StatusCode, artifact: Artifact) -> Response {
    let mut response = (status, artifact.body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(artifact.media_type));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
