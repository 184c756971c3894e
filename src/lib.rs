pub mod config;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod offramp;
pub mod routes;
pub mod state;
pub mod types;
pub mod worker;

pub mod eth;

// Expose a router builder so main.rs can be tiny
use axum::Router;
use state::AppState;

pub fn app(state: AppState) -> Router {
    routes::router(state)
}
