//! Exchange-rate service used by the CLI and the HTTP endpoint

use crate::cache::{ChainResolver, ResolveError};
use crate::data::ResolvedRates;

/// Thin facade over the chain resolver
#[derive(Debug, Clone)]
pub struct ExchangeRateService {
    resolver: ChainResolver,
}

impl ExchangeRateService {
    pub fn new(resolver: ChainResolver) -> Self {
        Self { resolver }
    }

    /// Resolves rates for `base` (default `USD`)
    pub async fn resolve(&self, base: Option<&str>) -> Result<ResolvedRates, ResolveError> {
        self.resolver.resolve(base).await
    }

    /// Resolves rates and renders them as provenance-tagged JSON text
    pub async fn get_exchange_rates(&self, base: Option<&str>) -> Result<String, ResolveError> {
        Ok(self.resolve(base).await?.to_json())
    }
}
