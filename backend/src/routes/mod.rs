//! Route definitions for the AgroX farm advisory API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Upper bound for one multipart image upload (three photos)
const IMAGE_UPLOAD_LIMIT: usize = 30 * 1024 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth routes (public)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - dashboard
        .nest("/dashboard", dashboard_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .merge(protected)
}

/// Dashboard routes (protected)
fn dashboard_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route("/environment/refresh", post(handlers::refresh_environment))
        .route(
            "/images",
            put(handlers::upload_images)
                .delete(handlers::clear_images)
                .layer(DefaultBodyLimit::max(IMAGE_UPLOAD_LIMIT)),
        )
        .route("/analyze", post(handlers::analyze))
        .route("/refine", post(handlers::refine))
        .route("/chat", post(handlers::send_chat_message))
        .route("/callback", post(handlers::request_callback))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
