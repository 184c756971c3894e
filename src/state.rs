use std::sync::Arc;

use crate::ledger::PayoutLedger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<PayoutLedger>,
}
