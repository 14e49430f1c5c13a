use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use crate::application::error::{AppError, HttpError};
use crate::domain::device::{DeviceConfig, DeviceKey};

use super::HttpState;

const SOURCE: &str = "infra::http::devices";

pub(super) async fn save_config(
    State(state): State<HttpState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Request body must be a JSON object",
                &rejection,
            )
            .into_response();
        }
    };

    let has_mac = body
        .get("mac")
        .and_then(Value::as_str)
        .is_some_and(|mac| !mac.trim().is_empty());
    if !has_mac {
        return AppError::validation("`mac` is required").into_response();
    }

    let config: DeviceConfig = match serde_json::from_value(body) {
        Ok(config) => config,
        Err(err) => return AppError::validation(err.to_string()).into_response(),
    };

    let device = config.mac.clone();
    match state.store.save(config).await {
        Ok(id) => {
            info!(
                target = "inkcast::http::devices",
                device = %device,
                config_id = id,
                "device config updated"
            );
            Json(json!({ "ok": true, "config_id": id })).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(super) async fn active_config(
    State(state): State<HttpState>,
    Path(mac): Path<String>,
) -> Result<Response, AppError> {
    let device = DeviceKey::parse(&mac).ok_or(AppError::NotFound)?;
    let record = state
        .store
        .history(&device)
        .await?
        .into_iter()
        .find(|record| record.active)
        .ok_or(AppError::NotFound)?;
    Ok(Json(record).into_response())
}

pub(super) async fn config_history(
    State(state): State<HttpState>,
    Path(mac): Path<String>,
) -> Result<Json<Value>, AppError> {
    let device = DeviceKey::parse(&mac).ok_or(AppError::NotFound)?;
    let configs = state.store.history(&device).await?;
    Ok(Json(json!({ "mac": device, "configs": configs })))
}

pub(super) async fn activate_config(
    State(state): State<HttpState>,
    Path((mac, id)): Path<(String, u64)>,
) -> Result<Json<Value>, AppError> {
    let device = DeviceKey::parse(&mac).ok_or(AppError::NotFound)?;
    if !state.store.activate(&device, id).await? {
        return Err(AppError::NotFound);
    }
    info!(
        target = "inkcast::http::devices",
        device = %device,
        config_id = id,
        "device config activated"
    );
    Ok(Json(json!({ "ok": true })))
}
