//! Vault registry — the static configuration of tracked vaults.
//!
//! The registry is owned by the deployment; this module carries the
//! built-in list plus the serde schema so a deployment can feed its
//! own JSON registry.

use serde::{Deserialize, Serialize};

/// Provider tag that drives adapter/strategy resolution.
///
/// Absent (`None` on [`Vault::provider`]) means the vault is routed by
/// name-keyword matching and ends up on a scraping strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Served by the Morpho GraphQL API, not scraped.
    CompoundBlue,
    Euler,
    Kamino,
    Amnis,
}

/// Static configuration for one tracked vault. Immutable for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    pub name: String,
    /// On-chain address (or protocol-specific identifier).
    pub address: String,
    /// 1 = Ethereum, 137 = Polygon, 101 = Solana/other non-EVM.
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    /// Asset symbol, e.g. "USDC".
    pub asset: String,
    /// Provider tag; absent implies default scraping resolution.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderType>,
    pub url: String,
}

impl Vault {
    fn new(
        name: &str,
        address: &str,
        chain_id: u64,
        asset: &str,
        provider: Option<ProviderType>,
        url: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            chain_id,
            asset: asset.to_string(),
            provider,
            url: url.to_string(),
        }
    }
}

/// The built-in vault list, in registry (processing) order.
pub fn builtin_vaults() -> Vec<Vault> {
    use ProviderType::*;
    vec![
        Vault::new(
            "High-Yield USDC Vault by Alphaping",
            "0xb0f05E4De970A1aaf77f8C2F823953a367504BA9",
            1,
            "USDC",
            None,
            "https://app.morpho.org/ethereum/vault/0xb0f05E4De970A1aaf77f8C2F823953a367504BA9/alphaping-usdc",
        ),
        Vault::new(
            "pufETH/WETH Loop on Euler Finance",
            "0x46BC453666BA11b4b08B0804E49A9D797546ee7D",
            1,
            "pufETH",
            Some(Euler),
            "https://app.euler.finance/vault/0x46BC453666BA11b4b08B0804E49A9D797546ee7D?network=ethereum",
        ),
        Vault::new(
            "Smokehouse High-Yield USDT by Steakhouse",
            "0xA0804346780b4c2e3bE118ac957D1DB82F9d7484",
            1,
            "USDT",
            None,
            "https://app.morpho.org/ethereum/vault/0xA0804346780b4c2e3bE118ac957D1DB82F9d7484/smokehouse-usdt",
        ),
        Vault::new(
            "OEV-Boosted High-Yield USDC by Yearn",
            "0x68Aea7b82Df6CcdF76235D46445Ed83f85F845A3",
            1,
            "USDC",
            None,
            "https://app.morpho.org/ethereum/vault/0x68Aea7b82Df6CcdF76235D46445Ed83f85F845A3/oev-boosted-usdc",
        ),
        Vault::new(
            "High-Yield USDC Vault by Hyperithm",
            "0x777791C4d6DC2CE140D00D2828a7C93503c67777",
            1,
            "USDC",
            None,
            "https://app.morpho.org/ethereum/vault/0x777791C4d6DC2CE140D00D2828a7C93503c67777/hyperithm-usdc",
        ),
        Vault::new(
            "High-Yield USDC Lending by Gauntlet",
            "0x781FB7F6d845E3bE129289833b04d43Aa8558c42",
            137,
            "USDC",
            Some(CompoundBlue),
            "https://www.compound.blue/0x781FB7F6d845E3bE129289833b04d43Aa8558c42",
        ),
        Vault::new(
            "High-Yield USDC Vault by Relend",
            "0x0F359FD18BDa75e9c49bC027E7da59a4b01BF32a",
            1,
            "USDC",
            None,
            "https://app.morpho.org/ethereum/vault/0x0F359FD18BDa75e9c49bC027E7da59a4b01BF32a/relend-usdc",
        ),
        Vault::new(
            "High-Yield USDC Vault by Steakhouse",
            "0xBEeFFF209270748ddd194831b3fa287a5386f5bC",
            1,
            "USDC",
            None,
            "https://app.morpho.org/ethereum/vault/0xBEeFFF209270748ddd194831b3fa287a5386f5bC/steakhouse-usdc",
        ),
        Vault::new(
            "SOL High APY Lending Strategy",
            "A1so1bPD3W1TfeFwboDh8yfAAVaVtcdAYBYCjhg2mJQ",
            101,
            "SOL",
            Some(Kamino),
            "https://app.kamino.finance/earn/lend/A1so1bPD3W1TfeFwboDh8yfAAVaVtcdAYBYCjhg2mJQ",
        ),
        Vault::new(
            "High-Yield USDT Lending by Gauntlet",
            "0xfD06859A671C21497a2EB8C5E3fEA48De924D6c8",
            137,
            "USDT",
            Some(CompoundBlue),
            "https://www.compound.blue/0xfD06859A671C21497a2EB8C5E3fEA48De924D6c8",
        ),
        Vault::new(
            "APT Low-risk High-interest Staking",
            "stake.amnis.finance",
            101,
            "APT",
            Some(Amnis),
            "https://stake.amnis.finance/stake",
        ),
        Vault::new(
            "OpenEden High-Yield USDC by Ouroboros",
            "0x2F21c6499fa53a680120e654a27640Fc8Aa40BeD",
            1,
            "USDC",
            None,
            "https://app.morpho.org/ethereum/vault/0x2F21c6499fa53a680120e654a27640Fc8Aa40BeD/openeden-usdc",
        ),
    ]
}

/// Canonical dashboard display order. Names missing from a result set
/// are skipped; results not named here are not displayed.
pub const DISPLAY_ORDER: &[&str] = &[
    "High-Yield USDC Vault by Alphaping",
    "Smokehouse High-Yield USDT by Steakhouse",
    "OEV-Boosted High-Yield USDC by Yearn",
    "High-Yield USDC Vault by Hyperithm",
    "High-Yield USDC Lending by Gauntlet",
    "High-Yield USDC Vault by Relend",
    "High-Yield USDC Vault by Steakhouse",
    "SOL High APY Lending Strategy",
    "High-Yield USDT Lending by Gauntlet",
    "APT Low-risk High-interest Staking",
    "OpenEden High-Yield USDC by Ouroboros",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_complete_and_unique() {
        let vaults = builtin_vaults();
        assert_eq!(vaults.len(), 12);

        let mut names: Vec<&str> = vaults.iter().map(|v| v.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12, "vault names must be unique within a run");
    }

    #[test]
    fn display_order_names_exist_in_registry() {
        let vaults = builtin_vaults();
        for name in DISPLAY_ORDER {
            assert!(
                vaults.iter().any(|v| v.name == *name),
                "display order references unknown vault: {name}"
            );
        }
    }

    #[test]
    fn registry_schema_round_trips_with_type_tag_optional() {
        let json = r#"{
            "name": "Test Vault",
            "address": "0xabc",
            "chainId": 1,
            "asset": "USDC",
            "url": "https://example.com/vault"
        }"#;
        let v: Vault = serde_json::from_str(json).unwrap();
        assert!(v.provider.is_none());

        let tagged = r#"{
            "name": "Tagged",
            "address": "0xdef",
            "chainId": 137,
            "asset": "USDT",
            "type": "compound_blue",
            "url": "https://example.com/tagged"
        }"#;
        let v: Vault = serde_json::from_str(tagged).unwrap();
        assert_eq!(v.provider, Some(ProviderType::CompoundBlue));
    }
}
