use thiserror::Error;

/// Failures on the ingestion path. Provider errors abort the current poll
/// tick without advancing the watermark; the other two skip a single event.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("rpc provider call failed: {0}")]
    Provider(String),

    #[error("decimals lookup failed for token {token}: {reason}")]
    TokenQuery { token: String, reason: String },

    #[error("malformed RentPaid event in tx {tx}: {reason}")]
    Normalization { tx: String, reason: String },
}
