//! Symbol, sector and index-code normalisation.
//!
//! Sources report identifiers with exchange suffixes, inconsistent spacing
//! and long-form sector descriptions. The helpers here map them onto the
//! tickers used as store keys.

use std::collections::HashMap;

/// Strips surrounding whitespace and the exchange `suffix` from a trade symbol.
///
/// Returns `None` if nothing is left.
///
/// ```
/// use barforge_types::normalize::normalize_symbol;
///
/// assert_eq!(normalize_symbol(" COMI.CA ", ".CA").as_deref(), Some("COMI"));
/// assert_eq!(normalize_symbol("ETEL", ".CA").as_deref(), Some("ETEL"));
/// assert_eq!(normalize_symbol(".CA", ".CA"), None);
/// ```
#[must_use]
pub fn normalize_symbol(raw: &str, suffix: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = if suffix.is_empty() {
        trimmed
    } else {
        trimmed.strip_suffix(suffix).unwrap_or(trimmed)
    };
    let symbol = stripped.trim();
    (!symbol.is_empty()).then(|| symbol.to_string())
}

/// Turns a sector description into a sector ticker.
///
/// Spaces are removed first, then `aliases` (keyed by the space-free
/// description) shorten overly long names, and finally `,`, `&` and `-` are
/// removed and the result is upper-cased.
///
/// ```
/// use std::collections::HashMap;
/// use barforge_types::normalize::normalize_sector;
///
/// let aliases = HashMap::new();
/// assert_eq!(normalize_sector("Real Estate", &aliases), "REALESTATE");
/// assert_eq!(normalize_sector("Food, Beverages & Tobacco", &aliases), "FOODBEVERAGESTOBACCO");
/// ```
#[must_use]
pub fn normalize_sector<S: std::hash::BuildHasher>(
    description: &str,
    aliases: &HashMap<String, String, S>,
) -> String {
    let compact: String = description.chars().filter(|c| !c.is_whitespace()).collect();
    let aliased = aliases.get(&compact).map_or(compact.as_str(), String::as_str);
    aliased
        .chars()
        .filter(|c| !matches!(c, ',' | '&' | '-') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Default sector alias table used when none is configured.
#[must_use]
pub fn default_sector_aliases() -> HashMap<String, String> {
    [
        ("Shipping&TransportationServices", "Shipping&Transportation"),
        (
            "IndustrialGoods,ServicesandAutomobiles",
            "Indust.Goods,&Automobiles",
        ),
        ("IT,Media&CommunicationServices", "IT,Media&Comm"),
        (
            "Contracting&ConstructionEngineering",
            "Contracting&Construction",
        ),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// Normalises a raw official-index code.
///
/// Every `strip` token is removed, then all whitespace, so `"EGX30 EWI"` with
/// `["EWI"]` becomes `"EGX30"` and `"EGX30 TR"` becomes `"EGX30TR"`.
#[must_use]
pub fn normalize_index_code(code: &str, strip: &[String]) -> String {
    let mut out = code.to_string();
    for token in strip.iter().filter(|t| !t.is_empty()) {
        out = out.replace(token.as_str(), "");
    }
    out.retain(|c| !c.is_whitespace());
    out
}
