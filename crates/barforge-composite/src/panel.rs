//! Dense timestamp × member price panel.

use std::collections::{BTreeSet, HashMap};

use barforge_store::BarStore;
use barforge_types::{Bar, Timeframe};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{Basket, PanelError};

const OPEN: usize = 0;
const HIGH: usize = 1;
const LOW: usize = 2;
const CLOSE: usize = 3;
const VWAP: usize = 4;
const FIELDS: usize = 5;

/// One filled panel cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// VWAP.
    pub vwap: f64,
    /// Volume traded in this bucket (zero when the member did not trade).
    pub volume: u64,
}

/// Gap-filled price grid for one basket.
///
/// Rows are the union of bucket starts observed for any member; columns are
/// the basket members in basket order. Every cell holds a price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricePanel {
    timestamps: Vec<DateTime<Utc>>,
    members: Vec<String>,
    cells: Vec<Cell>,
}

impl PricePanel {
    /// Returns the row timestamps in ascending order.
    #[must_use]
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Returns the member tickers (column order).
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Returns the cells of row `row`, one per member.
    #[must_use]
    pub fn row(&self, row: usize) -> &[Cell] {
        let width = self.members.len();
        &self.cells[row * width..(row + 1) * width]
    }

    /// Returns the cell at (`row`, `member`).
    #[must_use]
    pub fn cell(&self, row: usize, member: usize) -> Cell {
        self.cells[row * self.members.len() + member]
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if no member has any bar in the window.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Sparse per-member data collected before filling.
#[derive(Debug, Default)]
struct MemberData {
    bars: Vec<Bar>,
    fallback: Option<Bar>,
}

/// Collects member bars and fills them into a [`PricePanel`].
#[derive(Debug)]
pub struct PanelBuilder {
    basket_id: String,
    members: Vec<String>,
    data: HashMap<String, MemberData>,
}

impl PanelBuilder {
    /// Starts a panel for `basket`.
    #[must_use]
    pub fn new(basket: &Basket) -> Self {
        Self {
            basket_id: basket.id.clone(),
            members: basket.members.clone(),
            data: HashMap::with_capacity(basket.len()),
        }
    }

    /// Adds a member's bars in the window and its last bar at or before the window start.
    ///
    /// Tickers outside the basket are ignored.
    pub fn add_member(&mut self, ticker: &str, bars: Vec<Bar>, fallback: Option<Bar>) -> &mut Self {
        if self.members.iter().any(|m| m == ticker) {
            self.data
                .insert(ticker.to_string(), MemberData { bars, fallback });
        }
        self
    }

    /// Builds the filled panel.
    ///
    /// Price fields are filled per member: forward from the previous row,
    /// then backward for leading gaps, then from the fallback bar. Volume
    /// gaps are zero.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::IncompleteBasket`] if a member still has an
    /// empty price after filling.
    pub fn build(self) -> Result<PricePanel, PanelError> {
        let timestamps: Vec<DateTime<Utc>> = self
            .data
            .values()
            .flat_map(|d| d.bars.iter().map(|b| b.bucket_start))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if timestamps.is_empty() {
            return Ok(PricePanel {
                timestamps,
                members: self.members,
                cells: Vec::new(),
            });
        }

        let row_of: HashMap<DateTime<Utc>, usize> =
            timestamps.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        let rows = timestamps.len();
        let width = self.members.len();
        let mut cells = vec![
            Cell {
                open: 0.0,
                high: 0.0,
                low: 0.0,
                close: 0.0,
                vwap: 0.0,
                volume: 0,
            };
            rows * width
        ];

        for (col, member) in self.members.iter().enumerate() {
            let data = self.data.get(member);
            let mut fields: [Vec<Option<f64>>; FIELDS] = std::array::from_fn(|_| vec![None; rows]);
            let mut volume = vec![0u64; rows];

            for bar in data.map_or(&[][..], |d| d.bars.as_slice()) {
                let Some(&row) = row_of.get(&bar.bucket_start) else {
                    continue;
                };
                for (field, value) in price_fields(bar) {
                    fields[field][row] = value;
                }
                volume[row] = bar.volume;
            }

            let fallback = data.and_then(|d| d.fallback.as_ref());
            for (field, column) in fields.iter_mut().enumerate() {
                forward_fill(column);
                backward_fill(column);
                let seed = fallback.and_then(|b| price_fields(b)[field].1);
                for value in column.iter_mut().filter(|v| v.is_none()) {
                    *value = seed;
                }
            }

            for row in 0..rows {
                let price = |field: usize| {
                    fields[field][row].ok_or_else(|| PanelError::IncompleteBasket {
                        basket: self.basket_id.clone(),
                        member: member.clone(),
                    })
                };
                cells[row * width + col] = Cell {
                    open: price(OPEN)?,
                    high: price(HIGH)?,
                    low: price(LOW)?,
                    close: price(CLOSE)?,
                    vwap: price(VWAP)?,
                    volume: volume[row],
                };
            }
        }

        Ok(PricePanel {
            timestamps,
            members: self.members,
            cells,
        })
    }
}

fn price_fields(bar: &Bar) -> [(usize, Option<f64>); FIELDS] {
    [
        (OPEN, Some(bar.open)),
        (HIGH, Some(bar.high)),
        (LOW, Some(bar.low)),
        (CLOSE, Some(bar.close)),
        (VWAP, bar.vwap),
    ]
}

fn forward_fill(column: &mut [Option<f64>]) {
    let mut last = None;
    for value in column.iter_mut() {
        if value.is_some() {
            last = *value;
        } else {
            *value = last;
        }
    }
}

fn backward_fill(column: &mut [Option<f64>]) {
    let mut next = None;
    for value in column.iter_mut().rev() {
        if value.is_some() {
            next = *value;
        } else {
            *value = next;
        }
    }
}

/// Reads every member's bars since `t0` (and its fallback at or before `t0`)
/// from the store and builds the panel.
///
/// With no `t0` all stored bars are read and there is no fallback.
///
/// # Errors
///
/// Returns [`PanelError::Store`] on read failures and
/// [`PanelError::IncompleteBasket`] if a member cannot be priced.
pub async fn load_panel<S>(
    store: &S,
    basket: &Basket,
    timeframe: Timeframe,
    t0: Option<DateTime<Utc>>,
) -> Result<PricePanel, PanelError>
where
    S: BarStore + ?Sized,
{
    let mut builder = PanelBuilder::new(basket);
    for member in &basket.members {
        let fallback = match t0 {
            Some(t0) => store.last_bar_at_or_before(member, timeframe, t0).await?,
            None => None,
        };
        let bars = store.bars_since(member, timeframe, t0).await?;
        debug!(basket = %basket.id, %member, bars = bars.len(), has_fallback = fallback.is_some(), "Loaded member bars");
        builder.add_member(member, bars, fallback);
    }
    builder.build()
}
