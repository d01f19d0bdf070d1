//! Equal-weight reduction of a price panel.

use barforge_store::{BarStore, Watermark};
use barforge_types::{AssetClass, Bar, Timeframe};
use tracing::debug;

use crate::{Basket, PanelError, PricePanel, load_panel};

/// Reduces a filled panel to one composite bar per row.
///
/// Each price field is `scale · (1/n) · Σ member field`, with `n` the basket
/// size; volume is the plain sum over members.
#[must_use]
pub fn equal_weight(basket: &Basket, timeframe: Timeframe, panel: &PricePanel) -> Vec<Bar> {
    let n = panel.members().len();
    if n == 0 {
        return Vec::new();
    }
    let weight = 1.0 / n as f64;
    let scale = basket.effective_scale();

    panel
        .timestamps()
        .iter()
        .enumerate()
        .map(|(row, &bucket_start)| {
            let cells = panel.row(row);
            let mean = |pick: fn(&crate::Cell) -> f64| {
                cells.iter().map(|c| weight * pick(c)).sum::<f64>() * scale
            };
            Bar {
                ticker: basket.ticker.clone(),
                timeframe,
                bucket_start,
                open: mean(|c| c.open),
                high: mean(|c| c.high),
                low: mean(|c| c.low),
                close: mean(|c| c.close),
                volume: cells.iter().fold(0_u64, |acc, c| acc.saturating_add(c.volume)),
                vwap: Some(mean(|c| c.vwap)),
                asset_class: AssetClass::Index,
            }
        })
        .collect()
}

/// Builds the composite bars for `basket` from the bars already stored for
/// its members, starting at the composite's own watermark.
///
/// # Errors
///
/// Returns a [`PanelError`] if member bars cannot be read or priced.
pub async fn build_composite<S>(
    store: &S,
    basket: &Basket,
    timeframe: Timeframe,
    watermark: &Watermark,
) -> Result<Vec<Bar>, PanelError>
where
    S: BarStore + ?Sized,
{
    let t0 = watermark.bucket_start();
    let panel = load_panel(store, basket, timeframe, t0).await?;
    let bars = equal_weight(basket, timeframe, &panel);
    debug!(basket = %basket.id, %timeframe, rows = bars.len(), "Built composite");
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PanelBuilder;
    use approx::assert_relative_eq;
    use barforge_store::MemoryBarStore;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap() + TimeDelta::minutes(minute)
    }

    fn bar(ticker: &str, minute: i64, close: f64, volume: u64) -> Bar {
        Bar {
            ticker: ticker.to_string(),
            timeframe: Timeframe::Minute1,
            bucket_start: t(minute),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume,
            vwap: Some(close),
            asset_class: AssetClass::Equity,
        }
    }

    #[test]
    fn test_two_member_arithmetic() {
        let basket = Basket::new("pair", "PAIREWI", ["AAA", "BBB"]).normalized();
        let mut builder = PanelBuilder::new(&basket);
        builder
            .add_member("AAA", vec![bar("AAA", 0, 10.0, 100)], None)
            .add_member("BBB", vec![bar("BBB", 0, 20.0, 300)], None);
        let panel = builder.build().unwrap();

        let bars = equal_weight(&basket, Timeframe::Minute1, &panel);
        assert_eq!(bars.len(), 1);
        let composite = &bars[0];
        assert_relative_eq!(composite.close, 15.0);
        assert_relative_eq!(composite.open, 14.0);
        assert_relative_eq!(composite.vwap.unwrap(), 15.0);
        assert_eq!(composite.volume, 400);
        assert_eq!(composite.ticker, "PAIREWI");
        assert_eq!(composite.asset_class, AssetClass::Index);
        assert!(composite.is_consistent());
    }

    #[test]
    fn test_volume_sum_saturates() {
        let basket = Basket::new("pair", "PAIREWI", ["AAA", "BBB"]).normalized();
        let mut builder = PanelBuilder::new(&basket);
        builder
            .add_member("AAA", vec![bar("AAA", 0, 10.0, u64::MAX)], None)
            .add_member("BBB", vec![bar("BBB", 0, 20.0, 5)], None);
        let panel = builder.build().unwrap();

        let bars = equal_weight(&basket, Timeframe::Minute1, &panel);
        assert_eq!(bars[0].volume, u64::MAX);
    }

    #[test]
    fn test_scale_applies_to_prices_only() {
        let basket = Basket::new("pair", "PAIREWI", ["AAA", "BBB"]);
        let mut builder = PanelBuilder::new(&basket);
        builder
            .add_member("AAA", vec![bar("AAA", 0, 10.0, 100)], None)
            .add_member("BBB", vec![bar("BBB", 0, 20.0, 300)], None);
        let panel = builder.build().unwrap();

        let bars = equal_weight(&basket, Timeframe::Minute1, &panel);
        assert_relative_eq!(bars[0].close, 15_000.0);
        assert_eq!(bars[0].volume, 400);
    }

    #[tokio::test]
    async fn test_build_from_store_uses_watermark() {
        let store = MemoryBarStore::new();
        for b in [
            bar("AAA", 0, 10.0, 1),
            bar("AAA", 1, 11.0, 1),
            bar("BBB", 0, 20.0, 1),
            bar("AAA", 2, 12.0, 1),
        ] {
            store.insert(&b).await.unwrap();
        }
        let basket = Basket::new("pair", "PAIREWI", ["AAA", "BBB"]).normalized();

        let mut live = bar("PAIREWI", 1, 15.5, 2);
        live.asset_class = AssetClass::Index;
        let watermark = Watermark::from_last(Some(live));

        let bars = build_composite(&store, &basket, Timeframe::Minute1, &watermark)
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
        // BBB has no bar from t1 onwards and is seeded from its t0 fallback.
        assert_relative_eq!(bars[0].close, 15.5);
        assert_relative_eq!(bars[1].close, 16.0);
        assert_eq!(bars[1].volume, 1);
    }
}
