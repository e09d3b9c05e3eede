//! Public course endpoints
//!
//! - GET /courses - All courses with the topic list
//! - GET /courses/topic/{topic} - Courses filed under a topic
//! - GET /courses/{slug} - Course detail

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::services::{Catalog, CourseDetail};

/// GET /courses
pub async fn list(State(state): State<AppState>) -> Result<Json<Catalog>, ApiError> {
    let catalog = state.course_service.catalog(None).await?;
    Ok(Json(catalog))
}

/// GET /courses/topic/{topic}
pub async fn list_by_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<Json<Catalog>, ApiError> {
    let catalog = state.course_service.catalog(Some(&topic)).await?;
    Ok(Json(catalog))
}

/// GET /courses/{slug}
///
/// `enrolled` reflects the viewer when a session is present.
pub async fn detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<CourseDetail>, ApiError> {
    let detail = state.course_service.detail(&slug, viewer.id()).await?;
    Ok(Json(detail))
}
