//! Chain resolver over an ordered list of tiers
//!
//! Tiers are tried strictly in order, cheapest first. The first tier that
//! yields a fresh value whose base matches the key wins; the value is then
//! written back into every writable tier in front of it. Every tier-local
//! failure is recorded and skipped. Only exhaustion of the whole chain is
//! reported to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{is_expired, FileTier, MemoryTier, RemoteTier, Tier, TierError, TierKind};
use crate::config::Settings;
use crate::data::{Base, Provenance, RateSheet, RatesClient, RatesError, ResolvedRates};

/// One tier's failure during a resolution pass
#[derive(Debug)]
pub struct TierFailure {
    /// Position of the tier in the chain
    pub index: usize,
    pub tier: TierKind,
    pub error: TierError,
}

/// Errors that escape the resolver
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every tier failed for this key
    #[error("No tier could provide rates for base {base}: {}", summarize(.failures))]
    ChainExhausted {
        base: Base,
        failures: Vec<TierFailure>,
    },
}

fn summarize(failures: &[TierFailure]) -> String {
    if failures.is_empty() {
        return "chain has no tiers".to_string();
    }

    failures
        .iter()
        .map(|failure| format!("[{}] {}: {}", failure.index, failure.tier, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolves rate sheets through an ordered, fixed list of tiers
///
/// Cloning is cheap and clones share the same tier instances, so a single
/// memory tier backs every concurrent resolution.
#[derive(Clone)]
pub struct ChainResolver {
    tiers: Arc<[Arc<dyn Tier>]>,
}

impl ChainResolver {
    /// Creates a resolver over `tiers`, index 0 being tried first
    pub fn new(tiers: Vec<Arc<dyn Tier>>) -> Self {
        Self {
            tiers: tiers.into(),
        }
    }

    /// The tiers in resolution order
    pub fn tiers(&self) -> &[Arc<dyn Tier>] {
        &self.tiers
    }

    /// Resolves rates for an optional, un-normalized currency code
    ///
    /// `None` or a blank code resolves `USD`. Keys a tier cannot store fail
    /// in that tier only.
    pub async fn resolve(&self, base: Option<&str>) -> Result<ResolvedRates, ResolveError> {
        self.resolve_base(&Base::normalize(base)).await
    }

    /// Resolves rates for `base`
    ///
    /// # Returns
    /// * `Ok(ResolvedRates)` - The first fresh, base-matching value, tagged with its tier
    /// * `Err(ResolveError::ChainExhausted)` - If every tier failed
    #[instrument(skip_all, fields(base = %base))]
    pub async fn resolve_base(&self, base: &Base) -> Result<ResolvedRates, ResolveError> {
        let mut failures = Vec::new();

        for (index, tier) in self.tiers.iter().enumerate() {
            match attempt(tier.as_ref(), base).await {
                Ok(sheet) => {
                    info!(tier = %tier.kind(), index, "Resolved exchange rates");
                    self.write_back(base, &sheet, index).await;

                    return Ok(ResolvedRates {
                        sheet,
                        provenance: Provenance {
                            tier: tier.kind(),
                            index,
                            resolved_at: Utc::now(),
                        },
                    });
                }
                Err(error) => {
                    debug!(tier = %tier.kind(), index, error = %error, "Tier miss, trying next");
                    failures.push(TierFailure {
                        index,
                        tier: tier.kind(),
                        error,
                    });
                }
            }
        }

        warn!(attempts = failures.len(), "All tiers failed");
        Err(ResolveError::ChainExhausted {
            base: base.clone(),
            failures,
        })
    }

    /// Copies `sheet` into every writable tier before `found_at`, nearest first
    ///
    /// Failures are logged and dropped.
    async fn write_back(&self, base: &Base, sheet: &RateSheet, found_at: usize) {
        for (index, tier) in self.tiers[..found_at].iter().enumerate().rev() {
            if !tier.can_write() {
                continue;
            }

            match tier.write(base, sheet).await {
                Ok(()) => debug!(tier = %tier.kind(), index, "Wrote back resolved rates"),
                Err(error) => {
                    warn!(tier = %tier.kind(), index, error = %error, "Write-back failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for ChainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tiers.iter().map(|tier| tier.kind()))
            .finish()
    }
}

/// One tier attempt: read, enforce the tier's TTL, re-check the base
async fn attempt(tier: &dyn Tier, base: &Base) -> Result<RateSheet, TierError> {
    let entry = tier.read(base).await?;

    if is_expired(entry.stored_at, tier.expiration(), Utc::now()) {
        return Err(TierError::Expired(base.clone()));
    }

    entry.sheet.ensure_base(base)?;
    Ok(entry.sheet)
}

/// Builds the standard memory -> file -> remote chain from settings
pub fn exchange_rate_chain(settings: &Settings) -> Result<ChainResolver, RatesError> {
    let client = RatesClient::with_options(
        settings.app_id.clone(),
        settings.provider_url.clone(),
        Duration::from_secs(settings.request_timeout_secs),
    )?;

    let tiers: Vec<Arc<dyn Tier>> = vec![
        Arc::new(MemoryTier::new(Duration::from_secs(settings.memory_ttl_secs))),
        Arc::new(FileTier::new(
            settings.cache_file_template(),
            Duration::from_secs(settings.file_ttl_secs),
        )),
        Arc::new(RemoteTier::new(client)),
    ];

    Ok(ChainResolver::new(tiers))
}
