use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Datasets
        .route("/datasets/:dataset", get(handlers::get_dataset))
        .route("/datasets/:dataset/activate", post(handlers::activate_dataset))
        .route("/datasets/:dataset/refresh", post(handlers::refresh_dataset))
        .route("/datasets/:dataset/email", get(handlers::compose_email))
        // Watchlist
        .route("/watchlist", post(handlers::add_to_watchlist))
        .route("/watchlist/toggle", post(handlers::toggle_watchlist))
        .route("/watchlist/:title", delete(handlers::remove_from_watchlist))
        // Cache
        .route("/cache/clear", post(handlers::clear_cache))
        // Notifications
        .route(
            "/notifications/latest",
            get(handlers::latest_notification).delete(handlers::dismiss_notification),
        )
}
