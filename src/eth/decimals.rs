use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers::prelude::*;

use super::Erc20;
use crate::error::IngestError;

#[async_trait]
pub trait DecimalSource: Send + Sync {
    async fn decimals(&self, token: Address) -> Result<u8, IngestError>;
}

/// Resolves the `decimals()` of ERC-20 tokens. Decimals are immutable for a
/// deployed token, so results are cached for the lifetime of the process.
pub struct Erc20Decimals {
    provider: Arc<Provider<Http>>,
    cache: Mutex<HashMap<Address, u8>>,
}

impl Erc20Decimals {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DecimalSource for Erc20Decimals {
    async fn decimals(&self, token: Address) -> Result<u8, IngestError> {
        if let Some(known) = self.cache.lock().expect("decimals cache poisoned").get(&token) {
            return Ok(*known);
        }

        let decimals = Erc20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(|e| IngestError::TokenQuery {
                token: format!("{token:?}"),
                reason: e.to_string(),
            })?;

        self.cache
            .lock()
            .expect("decimals cache poisoned")
            .insert(token, decimals);

        Ok(decimals)
    }
}
