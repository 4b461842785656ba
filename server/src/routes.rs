use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::presence::lookup;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Relay socket (anonymous; identity is declared with `newUser`)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    let presence_routes = Router::new()
        .route(
            "/api/presence",
            axum::routing::get(lookup::get_presence_summary),
        )
        .route(
            "/api/presence/{user_id}",
            axum::routing::get(lookup::get_user_presence),
        );

    let health = Router::new()
        .route("/", axum::routing::get(banner))
        .route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(ws_routes)
        .merge(presence_routes)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        // Any origin may connect; there is no authentication to protect.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn banner() -> &'static str {
    "Notification relay is running"
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
