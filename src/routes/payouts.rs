use axum::{Json, extract::State};

use crate::state::AppState;
use crate::types::Payout;

/// The full ledger, newest first. Always succeeds; during provider outages
/// the response simply lags behind the chain.
pub async fn list_payouts(State(state): State<AppState>) -> Json<Vec<Payout>> {
    Json(state.ledger.list_all())
}
