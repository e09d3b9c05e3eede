//! Course management endpoints
//!
//! All routes act on courses owned by the current user; anyone else's
//! course answers 404.
//!
//! - GET/POST /courses/manage
//! - GET/PUT/DELETE /courses/manage/{id}
//! - GET/PUT /courses/manage/{id}/modules

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Course, CourseInput, Module, ModuleForm};
use crate::services::CourseWithTopics;

/// Body of a module formset submission
#[derive(Debug, Deserialize)]
pub struct ModuleFormset {
    pub modules: Vec<ModuleForm>,
}

/// GET /courses/manage
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Course>>, ApiError> {
    let courses = state.course_service.list_own(user.0.id).await?;
    Ok(Json(courses))
}

/// POST /courses/manage
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CourseInput>,
) -> Result<(StatusCode, Json<CourseWithTopics>), ApiError> {
    let course = state.course_service.create(user.0.id, body).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /courses/manage/{id}
pub async fn get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<CourseWithTopics>, ApiError> {
    let course = state.course_service.get_own(user.0.id, id).await?;
    Ok(Json(course))
}

/// PUT /courses/manage/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CourseInput>,
) -> Result<Json<CourseWithTopics>, ApiError> {
    let course = state.course_service.update(user.0.id, id, body).await?;
    Ok(Json(course))
}

/// DELETE /courses/manage/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.course_service.delete(user.0.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /courses/manage/{id}/modules
pub async fn modules(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Module>>, ApiError> {
    let modules = state.course_service.modules(user.0.id, id).await?;
    Ok(Json(modules))
}

/// PUT /courses/manage/{id}/modules
pub async fn update_modules(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ModuleFormset>,
) -> Result<Json<Vec<Module>>, ApiError> {
    let modules = state
        .course_service
        .update_modules(user.0.id, id, body.modules)
        .await?;
    Ok(Json(modules))
}
