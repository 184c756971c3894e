use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub mod payouts;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/payouts", get(payouts::list_payouts))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
