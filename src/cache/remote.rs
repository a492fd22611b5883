//! Remote tier backed by the rate provider
//!
//! Stateless pass-through: every read is a fresh fetch, writes are accepted
//! and dropped, and the TTL is always zero.

use std::time::Duration;

use async_trait::async_trait;

use super::{Entry, Tier, TierError, TierKind};
use crate::data::{Base, RateSheet, RatesClient, RatesError};

/// Read-only tier that fetches from the provider on every read
#[derive(Debug, Clone)]
pub struct RemoteTier {
    client: RatesClient,
}

impl RemoteTier {
    pub fn new(client: RatesClient) -> Self {
        Self { client }
    }
}

impl From<RatesError> for TierError {
    fn from(err: RatesError) -> Self {
        match err {
            RatesError::Payload(sheet_err) => sheet_err.into(),
            other => TierError::Io(other.to_string()),
        }
    }
}

#[async_trait]
impl Tier for RemoteTier {
    fn kind(&self) -> TierKind {
        TierKind::Remote
    }

    async fn read(&self, base: &Base) -> Result<Entry, TierError> {
        let sheet = self.client.fetch_latest(base).await?;
        // The provider may ignore `base` and answer in its default currency
        sheet.ensure_base(base)?;
        Ok(Entry::fresh(sheet))
    }

    async fn write(&self, _base: &Base, _sheet: &RateSheet) -> Result<(), TierError> {
        Ok(())
    }

    fn expiration(&self) -> Duration {
        Duration::ZERO
    }

    fn can_write(&self) -> bool {
        false
    }
}
