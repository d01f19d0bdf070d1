//! Cursor pagination over trade fetches.

use barforge_types::RawTrade;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{EventSource, SourceError, SymbolFilter};

/// Trades collected across pages.
#[derive(Debug, Clone, Default)]
pub struct TradeWindow {
    /// Trades in delivery order.
    pub trades: Vec<RawTrade>,
    /// Pages fetched.
    pub pages: usize,
    /// The page cap was hit before the source ran dry.
    pub truncated: bool,
}

/// Fetches every trade at or after `since`, `page_size` trades per call.
///
/// The cursor is inclusive: each next page starts at the time of the last
/// trade received, and trades already taken at that instant are skipped.
/// At most `max_pages` pages are fetched.
///
/// # Errors
///
/// Returns the source's error, or [`SourceError::Stalled`] if a full page
/// consists only of trades already taken (a source ignoring its cursor).
pub async fn fetch_trade_window<S>(
    source: &S,
    filter: &SymbolFilter,
    since: DateTime<Utc>,
    page_size: usize,
    max_pages: usize,
) -> Result<TradeWindow, SourceError>
where
    S: EventSource + ?Sized,
{
    let page_size = page_size.max(1);
    let mut window = TradeWindow::default();
    let mut cursor = since;
    // Trades already taken whose time equals `cursor`.
    let mut taken_at_cursor = 0usize;
    let mut exhausted = false;

    while window.pages < max_pages {
        // Over-ask by the trades we will skip so every full page advances.
        let request = page_size + taken_at_cursor;
        let page = source.fetch_trades(filter, cursor, request).await?;
        window.pages += 1;
        let full = page.len() >= request;

        let mut skipped = 0usize;
        let fresh: Vec<RawTrade> = page
            .into_iter()
            .filter(|t| {
                if t.time == cursor && skipped < taken_at_cursor {
                    skipped += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        if fresh.is_empty() {
            if full {
                return Err(SourceError::Stalled { cursor });
            }
            exhausted = true;
            break;
        }

        if let Some(last) = fresh.last().map(|t| t.time) {
            let at_last = fresh.iter().filter(|t| t.time == last).count();
            taken_at_cursor = if last == cursor {
                taken_at_cursor + at_last
            } else {
                at_last
            };
            cursor = last;
        }
        window.trades.extend(fresh);

        if !full {
            exhausted = true;
            break;
        }
    }

    if !exhausted {
        window.truncated = true;
        warn!(
            pages = window.pages,
            %cursor,
            "Trade page cap reached, trades after the cursor are skipped until the session anchor moves"
        );
    }
    debug!(trades = window.trades.len(), pages = window.pages, "Fetched trade window");
    Ok(window)
}
