// backend/src/eth/mod.rs

use ethers::prelude::*;

pub mod client;
pub mod decimals;

abigen!(
    RentPay,
    "./abi/RentPay.json"
);

// Only decimals() is needed; anything else about the token is opaque here.
abigen!(
    Erc20,
    r#"[
        function decimals() external view returns (uint8)
    ]"#
);
