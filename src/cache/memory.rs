//! In-process memory tier
//!
//! A shared map from key to `(sheet, stored_at)`. One instance is owned by the
//! chain and shared by every concurrent resolution through an `Arc`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{is_expired, Entry, Tier, TierError, TierKind};
use crate::data::{Base, RateSheet};

/// Memory tier with a fixed TTL
#[derive(Debug)]
pub struct MemoryTier {
    entries: RwLock<HashMap<Base, Entry>>,
    expiration: Duration,
}

impl MemoryTier {
    /// Creates an empty memory tier whose entries live for `expiration`
    pub fn new(expiration: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            expiration,
        }
    }

    /// Number of keys currently held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been stored yet
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Tier for MemoryTier {
    fn kind(&self) -> TierKind {
        TierKind::Memory
    }

    async fn read(&self, base: &Base) -> Result<Entry, TierError> {
        let entry = self
            .entries
            .read()
            .await
            .get(base)
            .cloned()
            .ok_or_else(|| TierError::NotFound(base.clone()))?;

        if is_expired(entry.stored_at, self.expiration, Utc::now()) {
            return Err(TierError::Expired(base.clone()));
        }

        entry.sheet.ensure_base(base)?;
        Ok(entry)
    }

    async fn write(&self, base: &Base, sheet: &RateSheet) -> Result<(), TierError> {
        sheet.ensure_base(base)?;

        self.entries
            .write()
            .await
            .insert(base.clone(), Entry::stored(sheet.clone(), Utc::now()));
        Ok(())
    }

    fn expiration(&self) -> Duration {
        self.expiration
    }

    fn can_write(&self) -> bool {
        true
    }
}
