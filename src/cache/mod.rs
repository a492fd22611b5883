//! Storage tiers and the chain resolver that walks them
//!
//! Each tier (memory, file, remote) satisfies the same [`Tier`] contract: a
//! read that either yields a validated rate sheet or fails locally, a write
//! with overwrite semantics, a fixed TTL, and a writability flag. The
//! [`ChainResolver`] queries tiers in order, falls through on any tier-local
//! failure, and writes freshly found values back into the faster tiers.

mod chain;
mod file;
mod memory;
mod remote;

pub use chain::{exchange_rate_chain, ChainResolver, ResolveError, TierFailure};
pub use file::FileTier;
pub use memory::MemoryTier;
pub use remote::RemoteTier;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::{Base, RateSheet, SheetError};

/// Identity of a tier, used for provenance and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    Memory,
    File,
    Remote,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TierKind::Memory => "memory",
            TierKind::File => "file",
            TierKind::Remote => "remote",
        })
    }
}

/// Tier-local failures
///
/// None of these escape the chain resolver; they only make it move on to
/// the next tier.
#[derive(Debug, Error)]
pub enum TierError {
    /// Nothing has ever been stored for this key
    #[error("No entry for base {0}")]
    NotFound(Base),

    /// An entry exists but its TTL has elapsed
    #[error("Entry for base {0} has expired")]
    Expired(Base),

    /// The payload is quoted against a different currency than the key
    #[error("Payload base {found} does not match requested base {expected}")]
    BaseMismatch { expected: String, found: String },

    /// The key cannot be stored by this tier, e.g. it would not make a safe file name
    #[error("Base {0} is not a plain currency code")]
    UnsupportedKey(Base),

    /// The payload could not be decoded
    #[error("Malformed rate payload: {0}")]
    MalformedPayload(String),

    /// Disk or network transport failure
    #[error("I/O failure: {0}")]
    Io(String),
}

impl From<SheetError> for TierError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Malformed(reason) => TierError::MalformedPayload(reason),
            SheetError::BaseMismatch { expected, found } => {
                TierError::BaseMismatch { expected, found }
            }
        }
    }
}

impl From<std::io::Error> for TierError {
    fn from(err: std::io::Error) -> Self {
        TierError::Io(err.to_string())
    }
}

/// A value read from a tier
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The stored (or fetched) rate sheet, already checked against the key
    pub sheet: RateSheet,
    /// When the entry was stored; `None` for values fetched fresh from source
    pub stored_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// An entry that was just fetched and has no storage timestamp
    pub fn fresh(sheet: RateSheet) -> Self {
        Self {
            sheet,
            stored_at: None,
        }
    }

    /// An entry stored at a known instant
    pub fn stored(sheet: RateSheet, stored_at: DateTime<Utc>) -> Self {
        Self {
            sheet,
            stored_at: Some(stored_at),
        }
    }
}

/// Uniform contract over memory, file and remote storage
///
/// `read` must never mutate tier state; `write` is the only mutating
/// operation and overwrites whatever was stored for the key.
#[async_trait]
pub trait Tier: Send + Sync {
    /// Which kind of tier this is
    fn kind(&self) -> TierKind;

    /// Reads the entry for `base`, validated against the key
    async fn read(&self, base: &Base) -> Result<Entry, TierError>;

    /// Stores `sheet` under `base`
    async fn write(&self, base: &Base, sheet: &RateSheet) -> Result<(), TierError>;

    /// How long a stored entry stays eligible to satisfy a read
    fn expiration(&self) -> Duration;

    /// Whether the resolver may write values back into this tier
    fn can_write(&self) -> bool;
}

/// Returns true when an entry stored at `stored_at` is no longer fresh.
///
/// An entry with no timestamp is a pass-through fetch and is always fresh.
/// A timestamped entry in a zero-TTL tier is always stale.
pub fn is_expired(stored_at: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(stored_at) = stored_at else {
        return false;
    };

    if ttl.is_zero() {
        return true;
    }

    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => stored_at
            .checked_add_signed(ttl)
            .map_or(false, |deadline| now > deadline),
        // A TTL too large for chrono never elapses
        Err(_) => false,
    }
}
