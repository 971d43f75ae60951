//! Structured-API adapter for the Morpho GraphQL endpoint.
//!
//! Compound Blue vaults are served by Morpho's API rather than scraped.
//! One query per vault: `{address, chainId}` → `{name, asset.symbol,
//! state.netApy}`. A missing vault record or a null rate is a soft
//! failure (`Ok(None)`), not a fetch error — only transport problems
//! surface as [`FetchError`] and get retried.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::FetchError;

/// Production GraphQL endpoint.
pub const MORPHO_API_URL: &str = "https://api.morpho.org/graphql";

const VAULT_NET_APY_QUERY: &str = "\
query GetVaultNetApy($address: String!, $chainId: Int!) {
  vaultByAddress(address: $address, chainId: $chainId) {
    address
    name
    asset { symbol }
    state { netApy }
  }
}";

/// Vault record as reported by the API, with the rate already unwrapped.
#[derive(Debug, Clone)]
pub struct ApiVault {
    pub name: String,
    pub address: String,
    pub symbol: Option<String>,
    /// Fractional net APY (0.061 = 6.1%).
    pub net_apy: f64,
}

/// Client for the Morpho GraphQL API.
#[derive(Clone)]
pub struct MorphoClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MorphoClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_endpoint(MORPHO_API_URL, timeout)
    }

    /// Point the client at a different endpoint (tests, mirrors).
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    /// Query one vault's net APY.
    ///
    /// Returns `Ok(None)` when the API has no record for the vault or
    /// reports a null rate.
    pub async fn vault_net_apy(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<ApiVault>, FetchError> {
        let body = json!({
            "query": VAULT_NET_APY_QUERY,
            "variables": { "address": address, "chainId": chain_id },
        });

        let resp = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let payload: GraphQlResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if !payload.errors.is_empty() {
            tracing::debug!(address, chain_id, errors = ?payload.errors, "GraphQL errors");
        }

        let Some(vault) = payload.data.and_then(|d| d.vault_by_address) else {
            tracing::debug!(address, chain_id, "vault not found in API");
            return Ok(None);
        };

        let Some(net_apy) = vault.state.and_then(|s| s.net_apy) else {
            tracing::debug!(address, chain_id, name = %vault.name, "no netApy in API record");
            return Ok(None);
        };

        Ok(Some(ApiVault {
            name: vault.name,
            address: vault.address,
            symbol: vault.asset.and_then(|a| a.symbol),
            net_apy,
        }))
    }
}

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "vaultByAddress")]
    vault_by_address: Option<WireVault>,
}

#[derive(Debug, Deserialize)]
struct WireVault {
    address: String,
    name: String,
    asset: Option<WireAsset>,
    state: Option<WireState>,
}

#[derive(Debug, Deserialize)]
struct WireAsset {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireState {
    #[serde(rename = "netApy")]
    net_apy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_record_deserializes() {
        let raw = r#"{
            "data": {
                "vaultByAddress": {
                    "address": "0x781F",
                    "name": "Gauntlet USDC",
                    "asset": { "symbol": "USDC" },
                    "state": { "netApy": 0.0834 }
                }
            }
        }"#;
        let resp: GraphQlResponse = serde_json::from_str(raw).unwrap();
        let vault = resp.data.unwrap().vault_by_address.unwrap();
        assert_eq!(vault.name, "Gauntlet USDC");
        assert_eq!(vault.state.unwrap().net_apy, Some(0.0834));
    }

    #[test]
    fn null_net_apy_is_a_soft_fail_shape() {
        let raw = r#"{
            "data": {
                "vaultByAddress": {
                    "address": "0x781F",
                    "name": "Gauntlet USDC",
                    "asset": { "symbol": "USDC" },
                    "state": { "netApy": null }
                }
            }
        }"#;
        let resp: GraphQlResponse = serde_json::from_str(raw).unwrap();
        let vault = resp.data.unwrap().vault_by_address.unwrap();
        assert_eq!(vault.state.unwrap().net_apy, None);
    }

    #[test]
    fn missing_vault_deserializes_to_none() {
        let raw = r#"{ "data": { "vaultByAddress": null } }"#;
        let resp: GraphQlResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.data.unwrap().vault_by_address.is_none());
    }

    #[test]
    fn graphql_errors_without_data() {
        let raw = r#"{ "data": null, "errors": [{"message": "boom"}] }"#;
        let resp: GraphQlResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors.len(), 1);
    }
}
