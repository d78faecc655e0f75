//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_record, delete_record, get_record, get_user_by_username, health_handler,
    search_records, stats_handler, update_record, AppState,
};
use crate::models::{Hotel, User};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /hotels`, `GET|PUT|DELETE /hotels/:id`
/// - `GET /search?q=&limit=&offset=` - Hotel search
/// - `POST /users`, `GET|PUT|DELETE /users/:id`, `GET /users/username/:username`
/// - `GET /users/search?q=&limit=&offset=` - User search
/// - `GET /stats` - Cache, chain and index counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/hotels", post(create_record::<Hotel>))
        .route(
            "/hotels/:id",
            get(get_record::<Hotel>)
                .put(update_record::<Hotel>)
                .delete(delete_record::<Hotel>),
        )
        .route("/search", get(search_records::<Hotel>))
        .route("/users", post(create_record::<User>))
        .route("/users/search", get(search_records::<User>))
        .route("/users/username/:username", get(get_user_by_username))
        .route(
            "/users/:id",
            get(get_record::<User>)
                .put(update_record::<User>)
                .delete(delete_record::<User>),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
