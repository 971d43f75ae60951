//! Generic rate extraction over provider profiles.
//!
//! One execution path driven by the [`ProviderProfile`] table instead
//! of a heuristic function per site family. Given fetched content, a
//! profile either yields a validated fractional rate or `None` — a
//! miss is a normal negative result, never an error.
//!
//! Stage order, most confident first:
//! 1. element-level CSS selector lookups (rendered HTML only);
//! 2. landmark elements — `div`/`span` whose text contains a known
//!    token like "Net APY";
//! 3. provider regex patterns over visible text, optionally narrowed
//!    to windows around the vault's asset symbol;
//! 4. a landmark rescue window scanned with the bare percentage regex;
//! 5. a global scan of every percentage on the page, keeping the max
//!    inside the profile's narrower scan range.
//!
//! Every candidate is validated against the profile's plausible range;
//! out-of-range values are dropped silently as page noise (price-change
//! badges, historical rates, fee percentages).

pub mod profiles;

pub use profiles::{Anchor, ProfileId, ProviderProfile, TieBreak, WaitMode};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Fetched document content handed to the extraction engine.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Full HTML, when the adapter can provide it.
    pub html: Option<String>,
    /// Visible body text (rendered `innerText`, or the raw body for
    /// the plain-HTTP adapter).
    pub text: String,
}

impl PageContent {
    pub fn rendered(html: String, text: String) -> Self {
        Self {
            html: Some(html),
            text,
        }
    }

    pub fn text_only(text: String) -> Self {
        Self { html: None, text }
    }
}

/// Extract a validated fractional rate (`0.061` = 6.1%) for one vault.
///
/// `asset` is the vault's asset symbol, used by asset-anchored
/// profiles to scope the scan on multi-reserve pages.
pub fn extract_rate(profile: &ProviderProfile, content: &PageContent, asset: &str) -> Option<f64> {
    let percent_re = Regex::new(r"(\d+\.?\d*)\s*%").expect("percent regex is valid");

    // 1 + 2: element-level lookups need parsed HTML.
    if let Some(html) = &content.html {
        let document = Html::parse_document(html);

        if let Some(pct) = selector_pass(profile, &document, &percent_re) {
            tracing::debug!(profile = profile.id.as_str(), pct, "selector hit");
            return Some(pct / 100.0);
        }
        if let Some(pct) = landmark_pass(profile, &document, &percent_re) {
            tracing::debug!(profile = profile.id.as_str(), pct, "landmark hit");
            return Some(pct / 100.0);
        }
    }

    let text = &content.text;

    // 3: textual patterns, asset-windowed first where configured.
    if let Anchor::Asset { radius } = profile.anchor {
        let windows = asset_windows(text, asset, radius);
        let mut best: Option<f64> = None;
        for window in &windows {
            match (profile.tie_break, pattern_pass(profile, window)) {
                (TieBreak::First, Some(pct)) => return Some(pct / 100.0),
                (TieBreak::MaxInRange, Some(pct)) => {
                    best = Some(best.map_or(pct, |b: f64| b.max(pct)));
                }
                _ => {}
            }
        }
        if let Some(pct) = best {
            tracing::debug!(profile = profile.id.as_str(), pct, "asset-window hit");
            return Some(pct / 100.0);
        }
    }

    if let Some(pct) = pattern_pass(profile, text) {
        tracing::debug!(profile = profile.id.as_str(), pct, "pattern hit");
        return Some(pct / 100.0);
    }

    // 4: rescue window around a landmark token, bare percent regex.
    if let Anchor::Landmark {
        token,
        before,
        after,
    } = profile.anchor
    {
        if let Some(idx) = text.find(token) {
            let window = char_window(text, idx, before, after);
            for cap in percent_re.captures_iter(window) {
                if let Some(pct) = parse_percent(&cap) {
                    if in_range(pct, profile.range) {
                        tracing::debug!(profile = profile.id.as_str(), pct, "rescue-window hit");
                        return Some(pct / 100.0);
                    }
                }
            }
        }
    }

    // 5: global percentage analysis inside the narrower scan range.
    if let Some(scan_range) = profile.scan_range {
        let best = percent_re
            .captures_iter(text)
            .filter_map(|cap| parse_percent(&cap))
            .filter(|pct| in_range(*pct, profile.range) && in_range(*pct, scan_range))
            .fold(None, |acc: Option<f64>, pct| {
                Some(acc.map_or(pct, |a| a.max(pct)))
            });
        if let Some(pct) = best {
            tracing::debug!(profile = profile.id.as_str(), pct, "percent-scan hit");
            return Some(pct / 100.0);
        }
    }

    None
}

/// First in-range percentage from the profile's CSS selectors.
fn selector_pass(profile: &ProviderProfile, document: &Html, percent_re: &Regex) -> Option<f64> {
    for selector_str in profile.selectors {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for el in document.select(&selector) {
            let text = element_text(&el);
            if let Some(pct) = first_in_range(percent_re, &text, profile.range) {
                return Some(pct);
            }
        }
    }
    None
}

/// First in-range percentage from a `div`/`span` containing a landmark
/// token. Replaces the `:has-text()` selectors the rendered pages were
/// originally probed with.
fn landmark_pass(profile: &ProviderProfile, document: &Html, percent_re: &Regex) -> Option<f64> {
    if profile.landmarks.is_empty() {
        return None;
    }
    let selector = Selector::parse("div, span").expect("landmark selector is valid");
    for landmark in profile.landmarks {
        for el in document.select(&selector) {
            let text = element_text(&el);
            if !text.contains(landmark) {
                continue;
            }
            if let Some(pct) = first_in_range(percent_re, &text, profile.range) {
                return Some(pct);
            }
        }
    }
    None
}

/// Run the profile's ordered pattern list over a block of text.
///
/// `First` checks only the first match of each pattern before moving
/// on; `MaxInRange` collects every match of every pattern and keeps
/// the highest in-range value.
fn pattern_pass(profile: &ProviderProfile, text: &str) -> Option<f64> {
    match profile.tie_break {
        TieBreak::First => {
            for pattern in profile.patterns {
                let re = compile_ci(pattern);
                if let Some(cap) = re.captures(text) {
                    if let Some(pct) = parse_percent(&cap) {
                        if in_range(pct, profile.range) {
                            return Some(pct);
                        }
                    }
                }
            }
            None
        }
        TieBreak::MaxInRange => {
            let mut best: Option<f64> = None;
            for pattern in profile.patterns {
                let re = compile_ci(pattern);
                for cap in re.captures_iter(text) {
                    if let Some(pct) = parse_percent(&cap) {
                        if in_range(pct, profile.range) {
                            best = Some(best.map_or(pct, |b| b.max(pct)));
                        }
                    }
                }
            }
            best
        }
    }
}

/// Text windows around each occurrence of the asset symbol.
fn asset_windows<'a>(text: &'a str, asset: &str, radius: usize) -> Vec<&'a str> {
    if asset.is_empty() {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find(asset) {
        let idx = from + rel;
        windows.push(char_window(text, idx, radius, radius + asset.len()));
        from = idx + asset.len();
    }
    windows
}

/// Slice `text` around byte index `idx`, clamped to char boundaries.
fn char_window(text: &str, idx: usize, before: usize, after: usize) -> &str {
    let mut start = idx.saturating_sub(before);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (idx + after).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

fn first_in_range(percent_re: &Regex, text: &str, range: (f64, f64)) -> Option<f64> {
    percent_re
        .captures_iter(text)
        .filter_map(|cap| parse_percent(&cap))
        .find(|pct| in_range(*pct, range))
}

fn parse_percent(cap: &regex::Captures<'_>) -> Option<f64> {
    cap.get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Zero is never a valid observed rate, whatever the bounds say.
fn in_range(pct: f64, (lo, hi): (f64, f64)) -> bool {
    pct > 0.0 && pct >= lo && pct <= hi
}

fn compile_ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("profile pattern is valid")
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use profiles::{AMNIS, BASIC, COMPOUND_BLUE, EULER, KAMINO, MORPHO};

    fn text(t: &str) -> PageContent {
        PageContent::text_only(t.to_string())
    }

    #[test]
    fn selector_lookup_wins_over_page_text() {
        let html = r#"<html><body>
            <span>price change -12.3%</span>
            <div data-testid="net-apy">6.12%</div>
            <p>Net APY 9.99%</p>
        </body></html>"#;
        let content = PageContent::rendered(html.to_string(), "ignored".to_string());
        let rate = extract_rate(&MORPHO, &content, "USDC").unwrap();
        assert!((rate - 0.0612).abs() < 1e-9);
    }

    #[test]
    fn landmark_element_fills_in_when_selectors_miss() {
        let html = r#"<html><body>
            <span class="stat">Net APY 6.12%</span>
        </body></html>"#;
        let content = PageContent::rendered(html.to_string(), String::new());
        let rate = extract_rate(&MORPHO, &content, "USDC").unwrap();
        assert!((rate - 0.0612).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_percentage_is_not_found() {
        // 37.5% is the only percentage; Compound Blue's range is 5-15.
        let rate = extract_rate(&COMPOUND_BLUE, &text("37.5% unrelated-stat"), "USDC");
        assert_eq!(rate, None);
    }

    #[test]
    fn out_of_range_match_does_not_shadow_later_patterns() {
        // First pattern matches 37.5 (rejected); nothing else matches.
        let rate = extract_rate(&AMNIS, &text("APR 37.5% today"), "APT");
        assert_eq!(rate, None);
    }

    #[test]
    fn max_tie_break_selects_highest_in_range() {
        let rate = extract_rate(&KAMINO, &text("6.1% APY and also 8.3% APY"), "ETH");
        assert!((rate.unwrap() - 0.083).abs() < 1e-9);
    }

    #[test]
    fn first_tie_break_respects_pattern_order() {
        // "Net APY 6.5%" outranks the later bare "8.1% APY".
        let rate = extract_rate(&MORPHO, &text("8.1% APY ... Net APY 6.5%"), "USDC");
        assert!((rate.unwrap() - 0.065).abs() < 1e-9);
    }

    #[test]
    fn kamino_collapsed_spacing_pattern_matches() {
        let rate = extract_rate(&KAMINO, &text("7.40%Supply APY"), "SOL");
        assert!((rate.unwrap() - 0.074).abs() < 1e-9);
    }

    #[test]
    fn asset_window_avoids_cross_asset_contamination() {
        // Two reserves on the same page; only the SOL row may win even
        // though USDC's rate is higher and MaxInRange is in effect.
        let filler = "· ".repeat(300);
        let page = format!("SOL reserve 7.4% Supply APY {filler} USDC reserve 9.9% Supply APY");
        let rate = extract_rate(&KAMINO, &text(&page), "SOL");
        assert!((rate.unwrap() - 0.074).abs() < 1e-9);
    }

    #[test]
    fn compound_percent_scan_takes_max_within_scan_range() {
        // No APY/Rate adjacency anywhere, so only the global scan can
        // fire: 7.2 and 11.8 are in 7-12, 14.5 is not.
        let rate = extract_rate(&COMPOUND_BLUE, &text("7.2% · 11.8% · 14.5%"), "USDC");
        assert!((rate.unwrap() - 0.118).abs() < 1e-9);
    }

    #[test]
    fn euler_supply_apy_with_spaced_percent() {
        let rate = extract_rate(&EULER, &text("Lend Supply APY: 6.94 % Borrow 8.2 %"), "pufETH");
        assert!((rate.unwrap() - 0.0694).abs() < 1e-9);
    }

    #[test]
    fn basic_profile_takes_first_plausible_percent() {
        let rate = extract_rate(&BASIC, &text("Earn 3.2% on deposits"), "USDC");
        assert!((rate.unwrap() - 0.032).abs() < 1e-9);
    }

    #[test]
    fn zero_percent_is_never_a_rate() {
        assert_eq!(extract_rate(&BASIC, &text("0% APY right now"), "USDC"), None);
    }

    #[test]
    fn empty_document_is_a_miss_not_an_error() {
        assert_eq!(extract_rate(&MORPHO, &text(""), "USDC"), None);
        let content = PageContent::rendered(String::new(), String::new());
        assert_eq!(extract_rate(&MORPHO, &content, "USDC"), None);
    }
}
