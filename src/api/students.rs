//! Student endpoints
//!
//! - POST /student/register - Register and log in
//! - POST /student/enroll-course - Enroll in a course
//! - GET /student/courses - Enrolled courses
//! - GET /student/course/{id} - Enrolled course at its first module
//! - GET /student/course/{id}/{module_id} - Enrolled course at a module

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::accounts::session_response;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::EnrollResponse;
use crate::models::CourseSummary;
use crate::services::{RegisterInput, StudentCourseView};

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub course_id: i64,
}

/// POST /student/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.register(body).await?;
    let session = state.user_service.open_session(user.id).await?;
    let (headers, body) = session_response(&state, user, session);
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /student/enroll-course
pub async fn enroll(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let course = state.student_service.enroll(user.0.id, body.course_id).await?;
    Ok(Json(EnrollResponse {
        course_id: course.id,
        enrolled: true,
        redirect: format!("/student/course/{}", course.id),
    }))
}

/// GET /student/courses
pub async fn list_courses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<CourseSummary>>, ApiError> {
    let courses = state.student_service.enrolled_courses(user.0.id).await?;
    Ok(Json(courses))
}

/// GET /student/course/{id}
pub async fn course_detail(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<StudentCourseView>, ApiError> {
    let view = state.student_service.course_view(user.0.id, id, None).await?;
    Ok(Json(view))
}

/// GET /student/course/{id}/{module_id}
pub async fn course_module(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, module_id)): Path<(i64, i64)>,
) -> Result<Json<StudentCourseView>, ApiError> {
    let view = state
        .student_service
        .course_view(user.0.id, id, Some(module_id))
        .await?;
    Ok(Json(view))
}
