//! Basket definitions.

use barforge_types::Timeframe;
use serde::{Deserialize, Serialize};

/// A named set of constituents whose equal-weighted average is stored as a
/// synthetic ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    /// Basket identifier (e.g. `"egx30"`).
    pub id: String,
    /// Ticker the composite series is stored under (e.g. `"EGX30LASTEWI"`).
    pub ticker: String,
    /// Ordered member tickers.
    pub members: Vec<String>,
    /// Price multiplier applied to composite prices.
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// Members are already on the stored scale; `scale` is ignored.
    #[serde(default)]
    pub normalized: bool,
    /// Timeframes the composite is built for; empty means every configured one.
    #[serde(default)]
    pub timeframes: Vec<Timeframe>,
}

const fn default_scale() -> u32 {
    1000
}

impl Basket {
    /// Creates a basket with the default scale, built for every timeframe.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        ticker: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            ticker: ticker.into(),
            members: members.into_iter().map(Into::into).collect(),
            scale: default_scale(),
            normalized: false,
            timeframes: Vec::new(),
        }
    }

    /// Sets the scale factor.
    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Marks the basket as already normalized.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Returns the multiplier actually applied to composite prices.
    #[must_use]
    pub fn effective_scale(&self) -> f64 {
        if self.normalized {
            1.0
        } else {
            f64::from(self.scale)
        }
    }

    /// Returns true if the composite is built at `timeframe`.
    #[must_use]
    pub fn applies_to(&self, timeframe: Timeframe) -> bool {
        self.timeframes.is_empty() || self.timeframes.contains(&timeframe)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the basket has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_scale() {
        let basket = Basket::new("egx30", "EGX30LASTEWI", ["COMI", "ETEL"]);
        assert!((basket.effective_scale() - 1000.0).abs() < 1e-10);
        assert!((basket.clone().with_scale(10).effective_scale() - 10.0).abs() < 1e-10);
        assert!((basket.normalized().effective_scale() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_applies_to() {
        let mut basket = Basket::new("egx30", "EGX30LASTEWI", ["COMI"]);
        assert!(basket.applies_to(Timeframe::Minute1));
        basket.timeframes = vec![Timeframe::Minute5];
        assert!(!basket.applies_to(Timeframe::Minute1));
        assert!(basket.applies_to(Timeframe::Minute5));
    }
}
