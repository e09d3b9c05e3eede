//! Topic endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Topic, TopicWithCount};
use crate::services::CreateTopicInput;

/// GET /topics
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TopicWithCount>>, ApiError> {
    let topics = state.topic_service.list().await?;
    Ok(Json(topics))
}

/// POST /topics
pub async fn create(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateTopicInput>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let topic = state.topic_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(topic)))
}
