//! API layer - HTTP handlers and routing
//!
//! JSON endpoints for:
//! - Accounts (login/logout/current user)
//! - Public course catalogue and topics
//! - Course, module and content management (owner only)
//! - Student registration, enrollment and enrolled-course views
//!
//! Media files referenced by file and image items are served as-is from
//! the media directory.

pub mod accounts;
pub mod content;
pub mod courses;
pub mod manage;
pub mod middleware;
pub mod responses;
pub mod students;
pub mod topics;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    response::Redirect,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::MediaConfig;

pub use middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};

/// Routes that need a logged-in user
pub fn protected_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/accounts/logout", post(accounts::logout))
        .route("/accounts/me", get(accounts::me))
        // Course management
        .route("/courses/manage", get(manage::list).post(manage::create))
        .route(
            "/courses/manage/{id}",
            get(manage::get).put(manage::update).delete(manage::delete),
        )
        .route(
            "/courses/manage/{id}/modules",
            get(manage::modules).put(manage::update_modules),
        )
        // Module contents
        .route("/courses/manage/module/{module_id}", get(content::module_contents))
        .route("/courses/manage/module/{module_id}/order", put(content::reorder))
        .route(
            "/courses/manage/module/{module_id}/content/{model_name}",
            post(content::create),
        )
        .route(
            "/courses/manage/module/{module_id}/content/{model_name}/{id}",
            get(content::get_item).put(content::update_item),
        )
        .route("/courses/manage/content/{id}", delete(content::delete))
        // Students
        .route("/student/enroll-course", post(students::enroll))
        .route("/student/courses", get(students::list_courses))
        .route("/student/course/{id}", get(students::course_detail))
        .route("/student/course/{id}/{module_id}", get(students::course_module))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

/// Routes open to anonymous visitors; a valid session is still picked up
pub fn public_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::permanent("/courses") }))
        .route("/courses", get(courses::list))
        .route("/courses/topic/{topic}", get(courses::list_by_topic))
        .route("/courses/{slug}", get(courses::detail))
        .route("/topics", get(topics::list).post(topics::create))
        .route("/student/register", post(students::register))
        .route("/accounts/login", post(accounts::login))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str, media: &MediaConfig) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let router = Router::new()
        .merge(public_router(state.clone()))
        .merge(protected_router(state.clone()))
        .nest_service(&media.mount_path(), ServeDir::new(&media.root))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
