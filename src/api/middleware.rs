//! API middleware
//!
//! Contains:
//! - Shared application state and its wiring
//! - The JSON error envelope and service error mapping
//! - Session authentication (cookie or Bearer token)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxContentRepository, SqlxCourseRepository, SqlxItemRepository, SqlxModuleRepository,
    SqlxSessionRepository, SqlxTopicRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::render::ContentRenderer;
use crate::services::{
    ContentService, ContentServiceError, CourseService, CourseServiceError, StudentService,
    StudentServiceError, TopicService, TopicServiceError, UserService, UserServiceError,
};

/// Where unauthenticated clients are sent to sign in
pub const LOGIN_URL: &str = "/accounts/login";

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub topic_service: Arc<TopicService>,
    pub course_service: Arc<CourseService>,
    pub content_service: Arc<ContentService>,
    pub student_service: Arc<StudentService>,
}

impl AppState {
    /// Wire repositories and services over a connection pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Result<Self> {
        let renderer = Arc::new(
            ContentRenderer::new(config.media.clone()).context("Failed to load item templates")?,
        );

        let course_repo = SqlxCourseRepository::boxed(pool.clone());
        let topic_repo = SqlxTopicRepository::boxed(pool.clone());
        let module_repo = SqlxModuleRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.session.expiration_days,
        ));
        let content_service = Arc::new(ContentService::new(
            SqlxContentRepository::boxed(pool.clone()),
            SqlxItemRepository::boxed(pool),
            module_repo.clone(),
            renderer,
        ));

        Ok(Self {
            user_service,
            topic_service: Arc::new(TopicService::new(topic_repo.clone())),
            course_service: Arc::new(CourseService::new(
                course_repo.clone(),
                topic_repo,
                module_repo.clone(),
            )),
            student_service: Arc::new(StudentService::new(
                course_repo,
                module_repo,
                content_service.clone(),
            )),
            content_service,
        })
    }
}

/// Authenticated user, set by [`require_auth`] or [`optional_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The current user if the request carried a valid session
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// 401 pointing the client at the login endpoint
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_details(
            "UNAUTHORIZED",
            message,
            serde_json::json!({ "login_url": LOGIN_URL }),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    /// 400 naming the offending input field
    pub fn validation_error(field: &str, message: impl Into<String>) -> Self {
        Self::with_details(
            "VALIDATION_ERROR",
            message,
            serde_json::json!({ "field": field }),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the full error chain and hide it from the client
    fn internal(e: &dyn std::fmt::Display) -> Self {
        tracing::error!("Request failed: {:#}", e);
        Self::internal_error("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(field, msg)
            | UserServiceError::UserExists(field, msg) => ApiError::validation_error(field, msg),
            UserServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<TopicServiceError> for ApiError {
    fn from(e: TopicServiceError) -> Self {
        match e {
            TopicServiceError::NotFound(msg) => ApiError::not_found(format!("Topic not found: {}", msg)),
            TopicServiceError::DuplicateSlug(slug) => {
                ApiError::validation_error("slug", format!("Topic with slug '{}' already exists", slug))
            }
            TopicServiceError::ValidationError(field, msg) => ApiError::validation_error(field, msg),
            TopicServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<CourseServiceError> for ApiError {
    fn from(e: CourseServiceError) -> Self {
        match e {
            CourseServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            CourseServiceError::DuplicateSlug(slug) => {
                ApiError::validation_error("slug", format!("Course with slug '{}' already exists", slug))
            }
            CourseServiceError::ValidationError(field, msg) => ApiError::validation_error(field, msg),
            CourseServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(e: ContentServiceError) -> Self {
        match e {
            ContentServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            ContentServiceError::ValidationError(field, msg) => ApiError::validation_error(field, msg),
            ContentServiceError::RenderError(e) => ApiError::internal(&e),
            ContentServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

impl From<StudentServiceError> for ApiError {
    fn from(e: StudentServiceError) -> Self {
        match e {
            StudentServiceError::NotFound(msg) => ApiError::not_found(format!("Not found: {}", msg)),
            StudentServiceError::Content(e) => e.into(),
            StudentServiceError::InternalError(e) => ApiError::internal(&e),
        }
    }
}

/// Extract the session token: `Authorization: Bearer` first, then the cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_str
        .split(';')
        .filter_map(|c| c.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(token: &str, days: i64) -> Option<HeaderValue> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        days.max(0) * 24 * 60 * 60
    );
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}
