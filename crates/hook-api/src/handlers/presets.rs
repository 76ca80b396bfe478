//! Subtitle preset handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hook_models::SubtitleStyle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertPresetRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(nested)]
    pub style: SubtitleStyle,
}

#[derive(Debug, Serialize)]
pub struct PresetResponse {
    pub name: String,
    pub style: SubtitleStyle,
    pub created: bool,
}

/// List all presets by name.
pub async fn list_presets(State(state): State<AppState>) -> Json<BTreeMap<String, SubtitleStyle>> {
    Json(state.presets.list().await)
}

/// Create or replace a preset.
pub async fn upsert_preset(
    State(state): State<AppState>,
    Json(body): Json<UpsertPresetRequest>,
) -> ApiResult<(StatusCode, Json<PresetResponse>)> {
    body.validate()?;
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Preset name must not be blank"));
    }

    let replaced = state.presets.upsert(name.clone(), body.style.clone()).await?;
    let status = if replaced {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(PresetResponse {
            name,
            style: body.style,
            created: !replaced,
        }),
    ))
}

/// Delete a preset.
pub async fn delete_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.presets.remove(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Unknown subtitle preset: {}", name)))
    }
}
