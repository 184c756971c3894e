use chrono::{SecondsFormat, Utc};
use ethers::types::U256;
use ethers::utils::{format_units, to_checksum};

use crate::error::IngestError;
use crate::types::{Payout, RawRentPaid};

// U256 can hold at most 78 decimal digits, so unit counts beyond this
// cannot be formatted.
const MAX_DECIMALS: u8 = 77;

/// Turn a raw chain event into a canonical payout record. Addresses are
/// EIP-55 checksummed, the amount becomes a display-decimal string, and the
/// timestamp is the ingestion instant (wall clock, not block time).
pub fn normalize(raw: &RawRentPaid, decimals: u8) -> Result<Payout, IngestError> {
    let amount = display_amount(raw.amount, decimals).map_err(|reason| {
        IngestError::Normalization {
            tx: format!("{:#x}", raw.tx_hash),
            reason,
        }
    })?;

    Ok(Payout {
        tenant: to_checksum(&raw.tenant, None),
        amount,
        stablecoin: to_checksum(&raw.stablecoin, None),
        landlord_upi: raw.landlord_upi.clone(),
        landlord_bank_details: raw.landlord_bank_details.clone(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        tx_hash: format!("{:#x}", raw.tx_hash),
    })
}

/// Format a raw integer amount at the given decimals as a decimal string,
/// trimming trailing fractional zeros but always keeping at least one
/// fractional digit: 1500000 at 6 decimals → "1.5", 1000000 → "1.0".
fn display_amount(amount: U256, decimals: u8) -> Result<String, String> {
    if decimals > MAX_DECIMALS {
        return Err(format!("unsupported decimals value {decimals}"));
    }

    let full = format_units(amount, u32::from(decimals)).map_err(|e| e.to_string())?;

    Ok(match full.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{int}.0")
            } else {
                format!("{int}.{frac}")
            }
        }
        None => format!("{full}.0"),
    })
}
