use ethers::types::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// A RentPaid event as it comes off the chain, before normalization.
#[derive(Debug, Clone)]
pub struct RawRentPaid {
    pub tenant: Address,
    pub amount: U256,
    pub stablecoin: Address,
    pub landlord_upi: String,
    pub landlord_bank_details: String,
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// A normalized rent payout, immutable once created. Field names on the
/// wire match what the dashboard already consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub tenant: String,
    pub amount: String,
    pub stablecoin: String,
    #[serde(rename = "landlordUPI")]
    pub landlord_upi: String,
    #[serde(rename = "landlordBankDetails")]
    pub landlord_bank_details: String,
    pub timestamp: String,
    #[serde(rename = "txHash")]
    pub tx_hash: String,
}
