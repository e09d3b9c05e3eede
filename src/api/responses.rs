//! Shared API response types

use serde::Serialize;

use crate::models::User;

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful login or registration
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Response after an enrollment
#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub course_id: i64,
    pub enrolled: bool,
    /// Where the student continues
    pub redirect: String,
}

/// Response after deleting a content
#[derive(Debug, Serialize)]
pub struct DeletedContentResponse {
    pub id: i64,
    pub module_id: i64,
}

/// Response after saving a new content order
#[derive(Debug, Serialize)]
pub struct OrderSavedResponse {
    pub saved: &'static str,
}
