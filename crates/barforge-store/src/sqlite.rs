//! SQLite-backed bar store.
//!
//! Every query runs on the blocking pool behind a shared connection, so a
//! write either completes or fails as a whole before the caller resumes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use barforge_types::{AssetClass, Bar, BarUpdate, Timeframe};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::gateway::{check_bar, check_ratio};
use crate::{BarStore, Result, StoreError};

const SCHEMA: &str = r"
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;

    CREATE TABLE IF NOT EXISTS bars (
        ticker       TEXT    NOT NULL,
        timeframe    TEXT    NOT NULL,
        bucket_start INTEGER NOT NULL,
        open         REAL    NOT NULL,
        high         REAL    NOT NULL,
        low          REAL    NOT NULL,
        close        REAL    NOT NULL,
        vwap         REAL,
        volume       INTEGER NOT NULL CHECK (volume >= 0),
        asset_class  INTEGER NOT NULL,
        PRIMARY KEY (ticker, timeframe, bucket_start)
    );
";

const COLUMNS: &str =
    "ticker, timeframe, bucket_start, open, high, low, close, vwap, volume, asset_class";

/// Bar store persisted in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteBarStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteBarStore {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create '{}': {e}", parent.display()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "Bar store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the database file path, if on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl BarStore for SqliteBarStore {
    async fn last_bar(&self, ticker: &str, timeframe: Timeframe) -> Result<Option<Bar>> {
        let ticker = ticker.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM bars WHERE ticker = ?1 AND timeframe = ?2 \
                 ORDER BY bucket_start DESC LIMIT 1"
            );
            conn.query_row(&sql, params![ticker, timeframe.as_str()], read_row)
                .optional()?
                .transpose()
        })
        .await
    }

    async fn last_bar_at_or_before(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<Option<Bar>> {
        let ticker = ticker.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM bars WHERE ticker = ?1 AND timeframe = ?2 \
                 AND bucket_start <= ?3 ORDER BY bucket_start DESC LIMIT 1"
            );
            conn.query_row(
                &sql,
                params![ticker, timeframe.as_str(), at.timestamp()],
                read_row,
            )
            .optional()?
            .transpose()
        })
        .await
    }

    async fn bars_since(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>> {
        let ticker = ticker.to_string();
        let since = since.map_or(i64::MIN, |t| t.timestamp());
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM bars WHERE ticker = ?1 AND timeframe = ?2 \
                 AND bucket_start >= ?3 ORDER BY bucket_start ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![ticker, timeframe.as_str(), since], read_row)?;
            let mut bars = Vec::new();
            for row in rows {
                bars.push(row??);
            }
            Ok(bars)
        })
        .await
    }

    async fn insert(&self, bar: &Bar) -> Result<()> {
        check_bar(bar)?;
        let bar = bar.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                &format!(
                    "INSERT INTO bars ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    bar.ticker,
                    bar.timeframe.as_str(),
                    bar.bucket_start.timestamp(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.vwap,
                    volume_to_sql(bar.volume)?,
                    bar.asset_class.flag(),
                ],
            );
            match inserted {
                Ok(_) => {
                    debug!(ticker = %bar.ticker, timeframe = %bar.timeframe, bucket = %bar.bucket_start, "Inserted bar");
                    Ok(())
                }
                Err(e) if is_constraint(&e) => Err(StoreError::WriteConflict {
                    ticker: bar.ticker,
                    timeframe: bar.timeframe,
                    bucket_start: bar.bucket_start,
                    reason: "bucket already stored",
                }),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn update_in_place(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        bucket_start: DateTime<Utc>,
        update: BarUpdate,
    ) -> Result<()> {
        let ticker = ticker.to_string();
        self.with_conn(move |conn| {
            let tf = timeframe.as_str();
            let ts = bucket_start.timestamp();
            let changed = match update {
                BarUpdate::Full {
                    open,
                    high,
                    low,
                    close,
                    vwap,
                    volume,
                } => conn.execute(
                    "UPDATE bars SET open = ?4, high = ?5, low = ?6, close = ?7, vwap = ?8, volume = ?9 \
                     WHERE ticker = ?1 AND timeframe = ?2 AND bucket_start = ?3",
                    params![
                        ticker,
                        tf,
                        ts,
                        open,
                        high,
                        low,
                        close,
                        vwap,
                        volume_to_sql(volume)?
                    ],
                )?,
                BarUpdate::Volume(volume) => conn.execute(
                    "UPDATE bars SET volume = ?4 \
                     WHERE ticker = ?1 AND timeframe = ?2 AND bucket_start = ?3",
                    params![ticker, tf, ts, volume_to_sql(volume)?],
                )?,
                BarUpdate::Prices {
                    open,
                    high,
                    low,
                    close,
                } => conn.execute(
                    "UPDATE bars SET open = ?4, high = ?5, low = ?6, close = ?7 \
                     WHERE ticker = ?1 AND timeframe = ?2 AND bucket_start = ?3",
                    params![ticker, tf, ts, open, high, low, close],
                )?,
            };

            if changed == 0 {
                return Err(StoreError::WriteConflict {
                    ticker,
                    timeframe,
                    bucket_start,
                    reason: "no stored bar to update",
                });
            }
            debug!(%ticker, %timeframe, bucket = %bucket_start, "Updated bar in place");
            Ok(())
        })
        .await
    }

    async fn rescale(&self, ticker: &str, ratio: f64, before: DateTime<Utc>) -> Result<u64> {
        check_ratio(ratio)?;
        let ticker = ticker.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE bars SET open = open / ?1, high = high / ?1, low = low / ?1, \
                 close = close / ?1, vwap = vwap / ?1 \
                 WHERE ticker = ?2 AND bucket_start < ?3",
                params![ratio, ticker, before.timestamp()],
            )?;
            info!(%ticker, ratio, %before, bars = changed, "Rescaled history");
            Ok(changed as u64)
        })
        .await
    }
}

/// Decodes one row; the outer error is SQLite's, the inner one ours.
fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<Bar>> {
    let ticker: String = row.get(0)?;
    let timeframe: String = row.get(1)?;
    let bucket_start: i64 = row.get(2)?;
    let open: f64 = row.get(3)?;
    let high: f64 = row.get(4)?;
    let low: f64 = row.get(5)?;
    let close: f64 = row.get(6)?;
    let vwap: Option<f64> = row.get(7)?;
    let volume: i64 = row.get(8)?;
    let flag: i64 = row.get(9)?;

    Ok(decode_key(&timeframe, bucket_start, volume, flag).map(
        |(timeframe, bucket_start, volume, asset_class)| Bar {
            ticker,
            timeframe,
            bucket_start,
            open,
            high,
            low,
            close,
            volume,
            vwap,
            asset_class,
        },
    ))
}

fn decode_key(
    timeframe: &str,
    bucket_start: i64,
    volume: i64,
    flag: i64,
) -> Result<(Timeframe, DateTime<Utc>, u64, AssetClass)> {
    let timeframe: Timeframe = timeframe
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("{e}")))?;
    let bucket_start = DateTime::from_timestamp(bucket_start, 0)
        .ok_or_else(|| StoreError::Corrupt(format!("bucket_start {bucket_start}")))?;
    let volume =
        u64::try_from(volume).map_err(|_| StoreError::Corrupt(format!("volume {volume}")))?;
    let asset_class = AssetClass::from_flag(flag)
        .ok_or_else(|| StoreError::Corrupt(format!("asset_class {flag}")))?;
    Ok((timeframe, bucket_start, volume, asset_class))
}

fn volume_to_sql(volume: u64) -> Result<i64> {
    i64::try_from(volume).map_err(|_| StoreError::Corrupt(format!("volume {volume} exceeds i64")))
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}
