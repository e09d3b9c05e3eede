//! Module content endpoints
//!
//! `{model_name}` is one of `text`, `file`, `image`, `video`; any other
//! value is a 404. Ownership of the module is checked on every request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{DeletedContentResponse, OrderSavedResponse};
use crate::models::{Item, ItemInput, ResolvedContent};
use crate::services::ModuleContents;

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    /// Content ids in their new order
    pub ids: Vec<i64>,
}

/// GET /courses/manage/module/{module_id}
pub async fn module_contents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(module_id): Path<i64>,
) -> Result<Json<ModuleContents>, ApiError> {
    let contents = state
        .content_service
        .module_contents(user.0.id, module_id)
        .await?;
    Ok(Json(contents))
}

/// PUT /courses/manage/module/{module_id}/order
pub async fn reorder(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(module_id): Path<i64>,
    Json(body): Json<OrderRequest>,
) -> Result<Json<OrderSavedResponse>, ApiError> {
    state
        .content_service
        .reorder(user.0.id, module_id, &body.ids)
        .await?;
    Ok(Json(OrderSavedResponse { saved: "OK" }))
}

/// POST /courses/manage/module/{module_id}/content/{model_name}
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((module_id, model_name)): Path<(i64, String)>,
    Json(body): Json<ItemInput>,
) -> Result<(StatusCode, Json<ResolvedContent>), ApiError> {
    let content = state
        .content_service
        .create_content(user.0.id, module_id, &model_name, body)
        .await?;
    Ok((StatusCode::CREATED, Json(content)))
}

/// GET /courses/manage/module/{module_id}/content/{model_name}/{id}
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((module_id, model_name, id)): Path<(i64, String, i64)>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .content_service
        .get_item(user.0.id, module_id, &model_name, id)
        .await?;
    Ok(Json(item))
}

/// PUT /courses/manage/module/{module_id}/content/{model_name}/{id}
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((module_id, model_name, id)): Path<(i64, String, i64)>,
    Json(body): Json<ItemInput>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .content_service
        .update_item(user.0.id, module_id, &model_name, id, body)
        .await?;
    Ok(Json(item))
}

/// DELETE /courses/manage/content/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedContentResponse>, ApiError> {
    let content = state.content_service.delete_content(user.0.id, id).await?;
    Ok(Json(DeletedContentResponse {
        id: content.id,
        module_id: content.module_id,
    }))
}
