//! Account endpoints
//!
//! - POST /accounts/login - Log in with username or email
//! - POST /accounts/logout - End the current session
//! - GET /accounts/me - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::api::middleware::{
    clear_session_cookie, extract_session_token, session_cookie, ApiError, AppState,
    AuthenticatedUser,
};
use crate::api::responses::{AuthResponse, UserResponse};
use crate::models::{Session, User};
use crate::services::LoginInput;

/// Response headers and body for a freshly opened session
pub(crate) fn session_response(
    state: &AppState,
    user: User,
    session: Session,
) -> (HeaderMap, Json<AuthResponse>) {
    let mut headers = HeaderMap::new();
    match session_cookie(&session.id, state.user_service.session_expiration_days()) {
        Some(cookie) => {
            headers.insert(header::SET_COOKIE, cookie);
        }
        None => tracing::warn!("Session token is not a valid cookie value"),
    }

    (
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    )
}

/// POST /accounts/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(body).await?;
    tracing::info!("User {} logged in", user.id);
    Ok(session_response(&state, user, session))
}

/// POST /accounts/logout
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;
    tracing::info!("User {} logged out", user.0.id);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, clear_session_cookie());
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /accounts/me
pub async fn me(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}
