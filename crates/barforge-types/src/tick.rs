//! Trade tick representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MalformedEvent, normalize::normalize_symbol};

/// A single executed trade.
///
/// Ticks are ephemeral: they are bucketized into [`Bar`](crate::Bar)s and
/// never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Normalised ticker (exchange suffix removed).
    pub symbol: String,
    /// Execution time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Trade price.
    pub price: f64,
    /// Traded quantity.
    pub volume: u64,
}

impl Tick {
    /// Creates a new tick.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, price: f64, volume: u64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            volume,
        }
    }

    /// Returns the traded notional (price × volume).
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.price * self.volume as f64
    }
}

/// Trade as delivered by the event source, before validation.
///
/// Sources report symbols with an exchange suffix and may leave price or
/// volume empty; [`RawTrade::validate`] turns a raw trade into a [`Tick`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    /// Symbol as reported by the source (e.g. `"COMI.CA"`).
    pub symbol: String,
    /// Execution time.
    pub time: DateTime<Utc>,
    /// Trade price, if reported.
    pub price: Option<f64>,
    /// Traded quantity, if reported.
    pub volume: Option<f64>,
}

impl RawTrade {
    /// Creates a new raw trade.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        time: DateTime<Utc>,
        price: Option<f64>,
        volume: Option<f64>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            time,
            price,
            volume,
        }
    }

    /// Validates the trade, stripping `suffix` from the symbol.
    ///
    /// # Errors
    ///
    /// Returns a [`MalformedEvent`] if the symbol is empty, the price is
    /// missing or not a positive finite number, or the volume is missing,
    /// negative, fractional or non-finite.
    pub fn validate(self, suffix: &str) -> Result<Tick, MalformedEvent> {
        let timestamp = self.time;
        let symbol =
            normalize_symbol(&self.symbol, suffix).ok_or(MalformedEvent::EmptySymbol { timestamp })?;

        let price = match self.price {
            None => return Err(MalformedEvent::MissingPrice { symbol, timestamp }),
            Some(p) if !p.is_finite() || p <= 0.0 => {
                return Err(MalformedEvent::InvalidPrice {
                    symbol,
                    timestamp,
                    price: p,
                });
            }
            Some(p) => p,
        };

        let volume = match self.volume {
            None => return Err(MalformedEvent::MissingVolume { symbol, timestamp }),
            Some(v) if !v.is_finite() || v < 0.0 || v.fract() != 0.0 => {
                return Err(MalformedEvent::InvalidVolume {
                    symbol,
                    timestamp,
                    volume: v,
                });
            }
            Some(v) => v as u64,
        };

        Ok(Tick {
            symbol,
            timestamp,
            price,
            volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 5).unwrap()
    }

    #[test]
    fn test_validate_strips_suffix() {
        let raw = RawTrade::new(" COMI.CA ", at(), Some(75.5), Some(1200.0));
        let tick = raw.validate(".CA").unwrap();
        assert_eq!(tick.symbol, "COMI");
        assert_eq!(tick.volume, 1200);
        assert!((tick.price - 75.5).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects_missing_price() {
        let raw = RawTrade::new("COMI.CA", at(), None, Some(10.0));
        assert!(matches!(
            raw.validate(".CA"),
            Err(MalformedEvent::MissingPrice { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_price() {
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let raw = RawTrade::new("COMI", at(), Some(price), Some(10.0));
            assert!(matches!(
                raw.validate(".CA"),
                Err(MalformedEvent::InvalidPrice { .. })
            ));
        }
    }

    #[test]
    fn test_validate_rejects_bad_volume() {
        for volume in [-5.0, 1.5, f64::NAN] {
            let raw = RawTrade::new("COMI", at(), Some(10.0), Some(volume));
            assert!(matches!(
                raw.validate(".CA"),
                Err(MalformedEvent::InvalidVolume { .. })
            ));
        }
        let raw = RawTrade::new("COMI", at(), Some(10.0), None);
        assert!(matches!(
            raw.validate(".CA"),
            Err(MalformedEvent::MissingVolume { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_symbol() {
        let raw = RawTrade::new("  .CA ", at(), Some(10.0), Some(1.0));
        assert!(matches!(
            raw.validate(".CA"),
            Err(MalformedEvent::EmptySymbol { .. })
        ));
    }

    #[test]
    fn test_notional() {
        let tick = Tick::new("COMI", at(), 2.5, 4);
        assert!((tick.notional() - 10.0).abs() < 1e-10);
    }
}
