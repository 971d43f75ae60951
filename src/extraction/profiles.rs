//! Per-provider extraction profiles.
//!
//! One row per known site family. Selector lists, textual patterns,
//! plausible ranges and settle delays encode what each provider's
//! rendered page actually looks like; the generic engine in the parent
//! module is the only execution path.

use std::time::Duration;

/// Identifier for an extraction profile (one per known site family).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileId {
    Morpho,
    CompoundBlue,
    Kamino,
    Amnis,
    Euler,
    Basic,
}

impl ProfileId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morpho => "morpho",
            Self::CompoundBlue => "compound_blue",
            Self::Kamino => "kamino",
            Self::Amnis => "amnis",
            Self::Euler => "euler",
            Self::Basic => "basic",
        }
    }
}

/// How to choose among multiple in-range pattern candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// First pattern hit wins (patterns are ordered most-specific first).
    First,
    /// Highest in-range value wins; supply/target rates dominate the
    /// secondary rates shown elsewhere on the page.
    MaxInRange,
}

/// How long to let the page settle after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Wait for the load/idle signal (bounded), then the settle delay.
    Idle,
    /// Don't wait for idle — some fronts (Cloudflare interstitials)
    /// never reach it. Navigate, then just sleep the settle delay.
    DomContentLoaded,
}

/// Text-window narrowing applied around the pattern stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    None,
    /// Restrict the pattern scan to windows around occurrences of the
    /// vault's asset symbol, to avoid cross-asset contamination on
    /// pages listing many reserves. Applied *before* the full-text scan.
    Asset { radius: usize },
    /// Rescue window around a landmark token, scanned with the bare
    /// percentage regex *after* the full-text patterns miss.
    Landmark {
        token: &'static str,
        before: usize,
        after: usize,
    },
}

/// Everything the generic engine needs to extract one provider's rate.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub id: ProfileId,
    /// Element-level CSS lookups, most specific first.
    pub selectors: &'static [&'static str],
    /// Landmark tokens for element-text matching (`div`/`span` whose
    /// text contains the token).
    pub landmarks: &'static [&'static str],
    /// Ordered regex patterns over visible text; each captures the
    /// numeric percentage in group 1. Compiled case-insensitive.
    pub patterns: &'static [&'static str],
    /// Plausible percentage range, inclusive. Candidates outside are
    /// discarded as noise (price changes, historical rates, fees).
    pub range: (f64, f64),
    pub tie_break: TieBreak,
    /// Optional last-resort scan of every percentage on the page,
    /// keeping the max within this narrower range.
    pub scan_range: Option<(f64, f64)>,
    pub anchor: Anchor,
    /// Render settle delay before extraction.
    pub settle: Duration,
    pub wait: WaitMode,
}

impl ProviderProfile {
    /// Look up the profile row for an id.
    pub fn get(id: ProfileId) -> &'static ProviderProfile {
        match id {
            ProfileId::Morpho => &MORPHO,
            ProfileId::CompoundBlue => &COMPOUND_BLUE,
            ProfileId::Kamino => &KAMINO,
            ProfileId::Amnis => &AMNIS,
            ProfileId::Euler => &EULER,
            ProfileId::Basic => &BASIC,
        }
    }
}

pub static MORPHO: ProviderProfile = ProviderProfile {
    id: ProfileId::Morpho,
    selectors: &[
        r#"[data-testid="net-apy"]"#,
        r#"[data-testid="apy"]"#,
        ".net-apy",
        ".apy",
    ],
    landmarks: &["Net APY", "APY"],
    patterns: &[
        r"Net APY\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*Net APY",
        r"APY\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*APY",
    ],
    range: (5.0, 25.0),
    tie_break: TieBreak::First,
    scan_range: None,
    anchor: Anchor::None,
    settle: Duration::from_secs(10),
    wait: WaitMode::Idle,
};

pub static COMPOUND_BLUE: ProviderProfile = ProviderProfile {
    id: ProfileId::CompoundBlue,
    selectors: &[
        r#"[data-testid="apy"]"#,
        r#"[data-testid="rate"]"#,
        r#"[data-testid="yield"]"#,
        ".apy",
        ".rate",
        ".yield",
    ],
    landmarks: &["APY", "Rate"],
    patterns: &[
        r"APY\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*APY",
        r"Rate\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*Rate",
    ],
    range: (5.0, 15.0),
    tie_break: TieBreak::First,
    // React app shows several rates; the supply APY sits in 7-12.
    scan_range: Some((7.0, 12.0)),
    anchor: Anchor::None,
    settle: Duration::from_secs(15),
    wait: WaitMode::Idle,
};

pub static KAMINO: ProviderProfile = ProviderProfile {
    id: ProfileId::Kamino,
    selectors: &[
        r#"[data-testid="apy"]"#,
        r#"[data-testid="supply-apy"]"#,
        ".apy",
        ".supply-apy",
        ".rate",
        ".yield",
    ],
    landmarks: &["Supply APY", "APY"],
    patterns: &[
        // Rendered spacing collapses: "7.40%Supply APY" is real output.
        r"(\d+\.?\d*)%Supply APY",
        r"Supply APY\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*Supply APY",
        r"APY\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*APY",
    ],
    range: (3.0, 15.0),
    tie_break: TieBreak::MaxInRange,
    scan_range: Some((5.0, 15.0)),
    // The lend page lists many reserves for the same market; scope the
    // scan to text near the vault's asset symbol.
    anchor: Anchor::Asset { radius: 400 },
    settle: Duration::from_secs(15),
    wait: WaitMode::Idle,
};

pub static AMNIS: ProviderProfile = ProviderProfile {
    id: ProfileId::Amnis,
    selectors: &[r#"[data-testid="apr"]"#, ".apr"],
    landmarks: &["APR"],
    patterns: &[r"APR\s*(\d+\.?\d*)%", r"(\d+\.?\d*)%\s*APR"],
    range: (5.0, 15.0),
    tie_break: TieBreak::First,
    scan_range: None,
    anchor: Anchor::None,
    settle: Duration::from_secs(8),
    wait: WaitMode::Idle,
};

pub static EULER: ProviderProfile = ProviderProfile {
    id: ProfileId::Euler,
    selectors: &[],
    landmarks: &[],
    patterns: &[
        r"Supply APY[:\s]*(\d+\.?\d*)\s*%",
        r"(\d+\.?\d*)\s*%\s*Supply APY",
        r"Supply APY[:\s]*(\d+\.?\d*)",
        r"(\d+\.?\d*)\s*%\s*Supply",
        r"Supply[:\s]*(\d+\.?\d*)\s*%",
        r"(\d+\.?\d*)\s*%",
    ],
    range: (1.0, 50.0),
    tie_break: TieBreak::First,
    scan_range: None,
    anchor: Anchor::Landmark {
        token: "Supply APY",
        before: 50,
        after: 100,
    },
    // Cloudflare-fronted; the idle signal never fires reliably.
    settle: Duration::from_secs(8),
    wait: WaitMode::DomContentLoaded,
};

pub static BASIC: ProviderProfile = ProviderProfile {
    id: ProfileId::Basic,
    selectors: &[],
    landmarks: &[],
    patterns: &[
        r"APY\s*(\d+\.?\d*)%",
        r"(\d+\.?\d*)%\s*APY",
        r"(\d+\.?\d*)%",
    ],
    range: (0.0, 50.0),
    tie_break: TieBreak::First,
    scan_range: None,
    anchor: Anchor::None,
    settle: Duration::from_secs(6),
    wait: WaitMode::Idle,
};
