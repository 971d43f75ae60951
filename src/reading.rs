//! Collection result types.
//!
//! A [`VaultReading`] is created once per vault per collection run and
//! never mutated afterwards. The `net_apy` field is either a fractional
//! rate (`0.061` = 6.1%) or a sentinel string; it is never null or NaN
//! on the wire.

use serde::{Deserialize, Serialize};

use crate::registry::Vault;

/// Non-numeric placeholder standing in for an unobtainable rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentinel {
    Error,
    Unavailable,
}

/// A net APY observation: fractional rate or sentinel.
///
/// Serializes untagged so a rate is a bare JSON number and a sentinel
/// is the string `"Error"` or `"Unavailable"`, matching the persisted
/// snapshot layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetApy {
    Rate(f64),
    Sentinel(Sentinel),
}

impl NetApy {
    /// The numeric rate, if this reading has one.
    pub fn rate(&self) -> Option<f64> {
        match self {
            Self::Rate(r) => Some(*r),
            Self::Sentinel(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Sentinel(Sentinel::Error))
    }
}

/// Which adapter/strategy produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Structured GraphQL API.
    MorphoApi,
    /// Rendered-page scraping.
    WebScraping,
    /// Plain HTTP fallback scraping.
    RawFetch,
    /// Scraping disabled; vault intentionally not collected.
    ApiOnly,
    /// Terminal failure; paired with the `Error` sentinel.
    Error,
}

/// One outcome per vault per collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultReading {
    pub name: String,
    pub address: String,
    pub asset: String,
    #[serde(rename = "netApy")]
    pub net_apy: NetApy,
    pub source: Source,
    pub url: String,
}

impl VaultReading {
    /// A successful reading with a fractional rate.
    pub fn rate(vault: &Vault, rate: f64, source: Source) -> Self {
        Self::build(vault, NetApy::Rate(rate), source)
    }

    /// A degraded reading carrying the `Error` sentinel.
    pub fn error(vault: &Vault) -> Self {
        Self::build(vault, NetApy::Sentinel(Sentinel::Error), Source::Error)
    }

    /// An `Unavailable` reading for a vault skipped in api-only mode.
    pub fn unavailable(vault: &Vault) -> Self {
        Self::build(vault, NetApy::Sentinel(Sentinel::Unavailable), Source::ApiOnly)
    }

    fn build(vault: &Vault, net_apy: NetApy, source: Source) -> Self {
        Self {
            name: vault.name.clone(),
            address: vault.address.clone(),
            asset: vault.asset.clone(),
            net_apy,
            source,
            url: vault.url.clone(),
        }
    }
}

/// Project a result list onto a fixed canonical display order.
///
/// Names in `order` with no matching reading are dropped silently;
/// readings not named in `order` are not included. The underlying full
/// list is what gets persisted — this is a display-only view.
pub fn apply_display_order<'a>(
    readings: &'a [VaultReading],
    order: &[&str],
) -> Vec<&'a VaultReading> {
    order
        .iter()
        .filter_map(|name| readings.iter().find(|r| r.name == *name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(name: &str, apy: NetApy) -> VaultReading {
        VaultReading {
            name: name.to_string(),
            address: format!("0x{name}"),
            asset: "USDC".to_string(),
            net_apy: apy,
            source: Source::WebScraping,
            url: format!("https://example.com/{name}"),
        }
    }

    #[test]
    fn net_apy_serializes_as_number_or_sentinel_string() {
        let rate = serde_json::to_value(NetApy::Rate(0.0612)).unwrap();
        assert_eq!(rate, serde_json::json!(0.0612));

        let err = serde_json::to_value(NetApy::Sentinel(Sentinel::Error)).unwrap();
        assert_eq!(err, serde_json::json!("Error"));

        let unavailable = serde_json::to_value(NetApy::Sentinel(Sentinel::Unavailable)).unwrap();
        assert_eq!(unavailable, serde_json::json!("Unavailable"));
    }

    #[test]
    fn net_apy_deserializes_both_shapes() {
        let rate: NetApy = serde_json::from_str("0.0612").unwrap();
        assert_eq!(rate.rate(), Some(0.0612));

        let err: NetApy = serde_json::from_str("\"Error\"").unwrap();
        assert!(err.is_error());
    }

    #[test]
    fn source_uses_original_wire_strings() {
        assert_eq!(
            serde_json::to_value(Source::MorphoApi).unwrap(),
            serde_json::json!("morpho_api")
        );
        assert_eq!(
            serde_json::to_value(Source::WebScraping).unwrap(),
            serde_json::json!("web_scraping")
        );
        assert_eq!(
            serde_json::to_value(Source::Error).unwrap(),
            serde_json::json!("error")
        );
    }

    #[test]
    fn display_order_drops_missing_and_unlisted() {
        let results = vec![
            reading("A", NetApy::Rate(0.05)),
            reading("B", NetApy::Rate(0.06)),
            reading("C", NetApy::Rate(0.07)),
            reading("D", NetApy::Rate(0.08)),
        ];
        // "X" has no reading; "D" is not in the canonical list.
        let view = apply_display_order(&results, &["A", "X", "C", "B"]);
        let names: Vec<&str> = view.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B"]);
        // The full list still carries D for persistence.
        assert!(results.iter().any(|r| r.name == "D"));
    }
}
