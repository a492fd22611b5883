//! Core data models for exchange-rate resolution
//!
//! This module contains the lookup key (`Base`), the rate payload every tier
//! stores and returns (`RateSheet`), and the provenance envelope handed back to
//! callers once a value has been resolved (`ResolvedRates`).

pub mod openexchangerates;

pub use openexchangerates::{RatesClient, RatesError};

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::cache::TierKind;

/// Currency used when the caller does not name one
pub const DEFAULT_BASE: &str = "USD";

/// Longest currency code accepted by [`Base::parse`]
const MAX_BASE_LEN: usize = 12;

/// Errors raised while decoding or validating a rate payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    /// The document is not a JSON object carrying `base` and `rates`
    #[error("Malformed rate payload: {0}")]
    Malformed(String),

    /// The payload was quoted against a different currency than requested
    #[error("Payload base {found} does not match requested base {expected}")]
    BaseMismatch { expected: String, found: String },
}

/// Rejected currency key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid base currency: '{0}'. Expected an alphanumeric currency code")]
pub struct InvalidBase(pub String);

/// A normalized currency code used as the lookup key in every tier
///
/// Keys are case-insensitive: they are trimmed and uppercased, and an absent
/// or blank key falls back to [`DEFAULT_BASE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Base(String);

impl Base {
    /// Normalizes an optional currency code without judging its contents.
    ///
    /// Whether an odd key is usable is left to each tier; the file tier, for
    /// one, refuses keys that are not plain codes.
    pub fn normalize(raw: Option<&str>) -> Self {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Self::default();
        }
        Self(trimmed.to_ascii_uppercase())
    }

    /// Parses an optional caller-supplied currency code strictly.
    ///
    /// # Returns
    /// * `Ok(Base)` with the uppercased code, or `USD` for `None`/blank input
    /// * `Err(InvalidBase)` if the code contains anything but ASCII letters and digits
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidBase> {
        let base = Self::normalize(raw);
        if !base.is_plain_code() {
            return Err(InvalidBase(raw.map(str::trim).unwrap_or_default().to_string()));
        }
        Ok(base)
    }

    /// True for short, purely alphanumeric codes such as `USD` or `XAU`
    pub fn is_plain_code(&self) -> bool {
        self.0.len() <= MAX_BASE_LEN && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// The uppercase currency code
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used to name per-key cache files
    pub fn file_stem(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl Default for Base {
    fn default() -> Self {
        Self(DEFAULT_BASE.to_string())
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Base {
    type Err = InvalidBase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

/// The fields every rate payload must carry
#[derive(Debug, Deserialize)]
struct SheetFields {
    base: String,
    rates: BTreeMap<String, f64>,
}

/// A rate quote as stored by the tiers
///
/// The raw JSON text is kept verbatim so the file tier can persist exactly
/// what the provider returned. `base` and `rates` are decoded up front; all
/// other provider fields (timestamp, license, ...) ride along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSheet {
    raw: String,
    document: Map<String, Value>,
    base: String,
    rates: BTreeMap<String, f64>,
}

impl RateSheet {
    /// Decodes a JSON rate payload.
    ///
    /// # Returns
    /// * `Ok(RateSheet)` if the text is an object with a string `base` and numeric `rates`
    /// * `Err(SheetError::Malformed)` otherwise
    pub fn parse(text: impl Into<String>) -> Result<Self, SheetError> {
        let raw = text.into();
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| SheetError::Malformed(e.to_string()))?;

        let Value::Object(document) = value else {
            return Err(SheetError::Malformed("expected a JSON object".to_string()));
        };

        let fields: SheetFields = serde_json::from_value(Value::Object(document.clone()))
            .map_err(|e| SheetError::Malformed(e.to_string()))?;

        Ok(Self {
            raw,
            document,
            base: fields.base,
            rates: fields.rates,
        })
    }

    /// Currency the rates are quoted against, as the payload spells it
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Currency code to rate mapping
    pub fn rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }

    /// Looks up a single rate
    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(&currency.to_ascii_uppercase()).copied()
    }

    /// The payload exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Verifies the payload's embedded base against the requested key.
    ///
    /// The comparison ignores case.
    pub fn ensure_base(&self, expected: &Base) -> Result<(), SheetError> {
        if self.base.eq_ignore_ascii_case(expected.as_str()) {
            Ok(())
        } else {
            Err(SheetError::BaseMismatch {
                expected: expected.to_string(),
                found: self.base.clone(),
            })
        }
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Kind of tier that produced the value
    pub tier: TierKind,
    /// Position of that tier in the chain (0 = fastest)
    pub index: usize,
    /// When the resolver accepted the value
    pub resolved_at: DateTime<Utc>,
}

/// A resolved rate sheet annotated with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRates {
    pub sheet: RateSheet,
    pub provenance: Provenance,
}

impl ResolvedRates {
    /// Renders the payload with a top-level `provenance` object added.
    ///
    /// Every field of the original payload is kept as-is.
    pub fn to_json(&self) -> String {
        Value::Object(self.tagged_document()).to_string()
    }

    /// Same as [`ResolvedRates::to_json`], indented for terminals
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&Value::Object(self.tagged_document()))
            .unwrap_or_else(|_| self.to_json())
    }

    fn tagged_document(&self) -> Map<String, Value> {
        let mut document = self.sheet.document.clone();
        let replaced = document.insert(
            "provenance".to_string(),
            json!({
                "tier": self.provenance.tier.to_string(),
                "index": self.provenance.index,
                "resolved_at": self
                    .provenance
                    .resolved_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        );
        if let Some(previous) = replaced {
            debug!(%previous, "Payload already carried a provenance field, replacing it");
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USD_SHEET: &str = r#"{"disclaimer":"test","timestamp":1700000000,"base":"USD","rates":{"EUR":0.9,"GBP":0.79}}"#;

    #[test]
    fn test_base_defaults_to_usd_when_absent_or_blank() {
        assert_eq!(Base::parse(None).unwrap().as_str(), "USD");
        assert_eq!(Base::parse(Some("")).unwrap().as_str(), "USD");
        assert_eq!(Base::parse(Some("   ")).unwrap().as_str(), "USD");
    }

    #[test]
    fn test_base_is_normalized_to_uppercase() {
        let base = Base::parse(Some(" eur ")).unwrap();
        assert_eq!(base.as_str(), "EUR");
        assert_eq!(base.file_stem(), "eur");
        assert_eq!(base.to_string(), "EUR");
    }

    #[test]
    fn test_base_rejects_path_characters() {
        assert!(Base::parse(Some("../etc")).is_err());
        assert!(Base::parse(Some("US D")).is_err());
        assert!("usd/".parse::<Base>().is_err());
    }

    #[test]
    fn test_normalize_keeps_unusual_keys_for_tiers_to_judge() {
        let base = Base::normalize(Some(" ../etc "));
        assert_eq!(base.as_str(), "../ETC");
        assert!(!base.is_plain_code());

        assert_eq!(Base::normalize(None), Base::default());
        assert!(Base::normalize(Some("xau")).is_plain_code());
        assert!(!Base::normalize(Some("ABCDEFGHIJKLM")).is_plain_code());
    }

    #[test]
    fn test_sheet_parse_decodes_base_and_rates() {
        let sheet = RateSheet::parse(USD_SHEET).unwrap();
        assert_eq!(sheet.base(), "USD");
        assert_eq!(sheet.rates().len(), 2);
        assert!((sheet.rate("eur").unwrap() - 0.9).abs() < f64::EPSILON);
        assert_eq!(sheet.raw(), USD_SHEET);
    }

    #[test]
    fn test_sheet_parse_rejects_missing_base() {
        let err = RateSheet::parse(r#"{"rates":{"EUR":0.9}}"#).unwrap_err();
        assert!(matches!(err, SheetError::Malformed(_)));
    }

    #[test]
    fn test_sheet_parse_rejects_non_object_and_garbage() {
        assert!(matches!(
            RateSheet::parse("[1,2,3]").unwrap_err(),
            SheetError::Malformed(_)
        ));
        assert!(matches!(
            RateSheet::parse(r#"{"base":"USD","rates":{"EUR":0.9}"#).unwrap_err(),
            SheetError::Malformed(_)
        ));
        assert!(matches!(
            RateSheet::parse(r#"{"base":"USD","rates":{"EUR":"high"}}"#).unwrap_err(),
            SheetError::Malformed(_)
        ));
    }

    #[test]
    fn test_ensure_base_is_case_insensitive_and_reports_mismatch() {
        let sheet = RateSheet::parse(r#"{"base":"usd","rates":{}}"#).unwrap();
        assert!(sheet.ensure_base(&Base::default()).is_ok());

        let eur = Base::parse(Some("EUR")).unwrap();
        assert_eq!(
            sheet.ensure_base(&eur).unwrap_err(),
            SheetError::BaseMismatch {
                expected: "EUR".to_string(),
                found: "usd".to_string(),
            }
        );
    }

    #[test]
    fn test_provenance_tag_keeps_payload_fields() {
        let resolved = ResolvedRates {
            sheet: RateSheet::parse(USD_SHEET).unwrap(),
            provenance: Provenance {
                tier: TierKind::File,
                index: 1,
                resolved_at: Utc::now(),
            },
        };

        let tagged: Value = serde_json::from_str(&resolved.to_json()).unwrap();
        assert_eq!(tagged["base"], "USD");
        assert_eq!(tagged["rates"]["EUR"], 0.9);
        assert_eq!(tagged["disclaimer"], "test");
        assert_eq!(tagged["timestamp"], 1_700_000_000);
        assert_eq!(tagged["provenance"]["tier"], "file");
        assert_eq!(tagged["provenance"]["index"], 1);

        // The tagged document still decodes as a rate sheet
        let reparsed = RateSheet::parse(resolved.to_json_pretty()).unwrap();
        assert_eq!(reparsed.rates(), resolved.sheet.rates());
    }

    #[test]
    fn test_provenance_tag_replaces_payload_provenance_field() {
        let resolved = ResolvedRates {
            sheet: RateSheet::parse(
                r#"{"base":"USD","rates":{"EUR":0.9},"provenance":"upstream"}"#,
            )
            .unwrap(),
            provenance: Provenance {
                tier: TierKind::Remote,
                index: 2,
                resolved_at: Utc::now(),
            },
        };

        let tagged: Value = serde_json::from_str(&resolved.to_json()).unwrap();
        assert_eq!(tagged["provenance"]["tier"], "remote");
        assert_eq!(tagged["provenance"]["index"], 2);
        assert_eq!(tagged["rates"]["EUR"], 0.9);
        // The sheet itself is left untouched
        assert!(resolved.sheet.raw().contains(r#""provenance":"upstream""#));
    }
}
