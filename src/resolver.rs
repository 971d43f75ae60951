//! Vault Resolver — maps a vault to the adapter and strategy to use.
//!
//! The provider type tag is authoritative. Untagged vaults fall back to
//! case-insensitive substring matching against the display name, in a
//! fixed priority order so overlapping keywords resolve
//! deterministically. Vaults nothing matches get the basic profile.

use crate::extraction::ProfileId;
use crate::registry::{ProviderType, Vault};

/// Which retrieval mechanism to use for a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// One GraphQL query, no scraping.
    StructuredApi,
    /// Headless-browser navigation, then extraction over rendered text.
    RenderedFetch,
    /// Plain HTTP GET, extraction over the unrendered body.
    RawFetch,
}

/// Adapter + strategy pairing for one vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub adapter: AdapterKind,
    /// Extraction profile; unused by the structured-API adapter.
    pub profile: ProfileId,
}

impl Route {
    /// The route to use when no renderer is available (or rendering is
    /// switched off): rendered fetches drop to plain HTTP with the
    /// same extraction profile. API routes are unaffected.
    pub fn degraded(self) -> Self {
        match self.adapter {
            AdapterKind::RenderedFetch => Self {
                adapter: AdapterKind::RawFetch,
                profile: self.profile,
            },
            AdapterKind::StructuredApi | AdapterKind::RawFetch => self,
        }
    }
}

/// Keyword table for name-based routing, highest priority first.
/// Morpho-branded curator names come before the protocol keywords so a
/// name like "Steakhouse" never leaks onto another profile.
const NAME_KEYWORDS: &[(&str, ProfileId)] = &[
    ("morpho", ProfileId::Morpho),
    ("openeden", ProfileId::Morpho),
    ("smokehouse", ProfileId::Morpho),
    ("alphaping", ProfileId::Morpho),
    ("steakhouse", ProfileId::Morpho),
    ("hyperithm", ProfileId::Morpho),
    ("relend", ProfileId::Morpho),
    ("yearn", ProfileId::Morpho),
    ("ouroboros", ProfileId::Morpho),
    ("compound", ProfileId::CompoundBlue),
    ("gauntlet", ProfileId::CompoundBlue),
    ("kamino", ProfileId::Kamino),
    ("sol", ProfileId::Kamino),
    ("amnis", ProfileId::Amnis),
    ("apt", ProfileId::Amnis),
    ("euler", ProfileId::Euler),
];

/// Resolve the adapter kind and extraction profile for a vault.
pub fn resolve(vault: &Vault) -> Route {
    // The type tag wins outright.
    if let Some(provider) = vault.provider {
        return match provider {
            ProviderType::CompoundBlue => Route {
                adapter: AdapterKind::StructuredApi,
                profile: ProfileId::CompoundBlue,
            },
            ProviderType::Euler => Route {
                adapter: AdapterKind::RenderedFetch,
                profile: ProfileId::Euler,
            },
            ProviderType::Kamino => Route {
                adapter: AdapterKind::RenderedFetch,
                profile: ProfileId::Kamino,
            },
            ProviderType::Amnis => Route {
                adapter: AdapterKind::RenderedFetch,
                profile: ProfileId::Amnis,
            },
        };
    }

    // Best-effort name matching, first hit wins.
    let name = vault.name.to_lowercase();
    let profile = NAME_KEYWORDS
        .iter()
        .find(|(kw, _)| name.contains(kw))
        .map(|(_, p)| *p)
        .unwrap_or(ProfileId::Basic);

    Route {
        adapter: AdapterKind::RenderedFetch,
        profile,
    }
}
