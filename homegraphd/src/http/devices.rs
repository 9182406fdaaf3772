use crate::{http::error::ApiError, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use homegraph_core::{
    forms::DeviceForm,
    model::{Attributes, DeviceTrait, TraitType},
};
use serde::Deserialize;
use std::collections::BTreeMap;

pub async fn list(State(app): State<AppState>) -> impl IntoResponse {
    Json(app.repository.get_all().await)
}

pub async fn show(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Response, ApiError> {
    let device = app.repository.get(&device_id).await?;
    Ok(Json(device).into_response())
}

pub async fn create(
    State(app): State<AppState>,
    Json(form): Json<DeviceForm>,
) -> Result<Response, ApiError> {
    let device = form.into_device();
    app.repository.create(device.clone()).await?;
    Ok((StatusCode::CREATED, Json(device)).into_response())
}

pub async fn update(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
    Json(form): Json<DeviceForm>,
) -> Result<Response, ApiError> {
    let device = app.repository.edit(&device_id, |d| form.apply_to(d)).await?;
    Ok(Json(device).into_response())
}

pub async fn delete(
    State(app): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Response, ApiError> {
    app.repository.remove(&device_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TraitBody {
    attributes: Option<Attributes>,
    commands: BTreeMap<String, BTreeMap<String, String>>,
    state: BTreeMap<String, String>,
}

pub async fn put_trait(
    State(app): State<AppState>,
    Path((device_id, trait_name)): Path<(String, String)>,
    Json(body): Json<TraitBody>,
) -> Result<Response, ApiError> {
    let device_trait = DeviceTrait {
        kind: TraitType::from(trait_name),
        attributes: body.attributes,
        commands: body.commands,
        state: body.state,
    };
    let device = app.repository.edit(&device_id, |d| d.upsert_trait(device_trait)).await?;
    Ok(Json(device).into_response())
}

pub async fn delete_trait(
    State(app): State<AppState>,
    Path((device_id, trait_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind = TraitType::from(trait_name);
    if app.repository.get(&device_id).await?.find_trait(&kind).is_none() {
        let body = Json(serde_json::json!({ "errors": [format!("Trait '{kind}' not found")] }));
        return Ok((StatusCode::NOT_FOUND, body).into_response());
    }
    let device = app
        .repository
        .edit(&device_id, |d| {
            d.remove_trait(&kind);
        })
        .await?;
    Ok(Json(device).into_response())
}
