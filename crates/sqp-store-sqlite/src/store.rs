//! [`SqliteStore`], the SQLite implementation of [`LedgerStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use sqp_core::{calendar::Quarter, ledger::KeywordLedger, store::LedgerStore};

use crate::{
  Result,
  encode::{LedgerRows, RawAlert, RawKeyword, RawLedger, RawMetric},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ledger store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row access ──────────────────────────────────────────────────────────────

/// Read every row of one ledger, or `None` if no ledger row exists.
fn read_rows(
  conn: &rusqlite::Connection,
  asin: &str,
  year: i32,
  quarter: u8,
) -> rusqlite::Result<Option<LedgerRows>> {
  let ledger = conn
    .query_row(
      "SELECT asin, year, quarter, sku, last_week FROM ledgers
       WHERE asin = ?1 AND year = ?2 AND quarter = ?3",
      rusqlite::params![asin, year, quarter],
      |row| {
        Ok(RawLedger {
          asin:      row.get(0)?,
          year:      row.get(1)?,
          quarter:   row.get(2)?,
          sku:       row.get(3)?,
          last_week: row.get(4)?,
        })
      },
    )
    .optional()?;

  let Some(ledger) = ledger else {
    return Ok(None);
  };

  let keywords = conn
    .prepare(
      "SELECT rank, keyword, in_title, in_backend FROM tracked_keywords
       WHERE asin = ?1 AND year = ?2 AND quarter = ?3
       ORDER BY rank",
    )?
    .query_map(rusqlite::params![asin, year, quarter], |row| {
      Ok(RawKeyword {
        rank:       row.get(0)?,
        keyword:    row.get(1)?,
        in_title:   row.get(2)?,
        in_backend: row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let metrics = conn
    .prepare(
      "SELECT rank, week, search_volume, impression_share, click_share,
              purchase_share, rank_status, diagnostic, opportunity_score,
              category, asin_price, market_price
       FROM weekly_metrics
       WHERE asin = ?1 AND year = ?2 AND quarter = ?3
       ORDER BY rank, week",
    )?
    .query_map(rusqlite::params![asin, year, quarter], |row| {
      Ok(RawMetric {
        rank:              row.get(0)?,
        week:              row.get(1)?,
        search_volume:     row.get(2)?,
        impression_share:  row.get(3)?,
        click_share:       row.get(4)?,
        purchase_share:    row.get(5)?,
        rank_status:       row.get(6)?,
        diagnostic:        row.get(7)?,
        opportunity_score: row.get(8)?,
        category:          row.get(9)?,
        asin_price:        row.get(10)?,
        market_price:      row.get(11)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let alerts = conn
    .prepare(
      "SELECT seq, keyword, kind, week FROM alerts
       WHERE asin = ?1 AND year = ?2 AND quarter = ?3
       ORDER BY seq",
    )?
    .query_map(rusqlite::params![asin, year, quarter], |row| {
      Ok(RawAlert {
        seq:     row.get(0)?,
        keyword: row.get(1)?,
        kind:    row.get(2)?,
        week:    row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(LedgerRows { ledger, keywords, metrics, alerts }))
}

/// Write `rows` inside one transaction. History rows already present are
/// left untouched; only the ledger cursor and placement flags change.
fn write_rows(
  conn: &mut rusqlite::Connection,
  rows: &LedgerRows,
  now: &str,
) -> rusqlite::Result<()> {
  let LedgerRows { ledger, keywords, metrics, alerts } = rows;
  let tx = conn.transaction()?;

  tx.execute(
    "INSERT INTO ledgers (asin, year, quarter, sku, last_week, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
     ON CONFLICT (asin, year, quarter) DO UPDATE SET
       sku        = excluded.sku,
       last_week  = excluded.last_week,
       updated_at = excluded.updated_at",
    rusqlite::params![ledger.asin, ledger.year, ledger.quarter, ledger.sku, ledger.last_week, now],
  )?;

  {
    let mut stmt = tx.prepare(
      "INSERT INTO tracked_keywords (asin, year, quarter, rank, keyword, in_title, in_backend)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
       ON CONFLICT (asin, year, quarter, rank) DO UPDATE SET
         in_title   = excluded.in_title,
         in_backend = excluded.in_backend",
    )?;
    for k in keywords {
      stmt.execute(rusqlite::params![
        ledger.asin,
        ledger.year,
        ledger.quarter,
        k.rank,
        k.keyword,
        k.in_title,
        k.in_backend,
      ])?;
    }
  }

  {
    let mut stmt = tx.prepare(
      "INSERT OR IGNORE INTO weekly_metrics (
         asin, year, quarter, rank, week, search_volume, impression_share,
         click_share, purchase_share, rank_status, diagnostic, opportunity_score,
         category, asin_price, market_price
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;
    for m in metrics {
      stmt.execute(rusqlite::params![
        ledger.asin,
        ledger.year,
        ledger.quarter,
        m.rank,
        m.week,
        m.search_volume,
        m.impression_share,
        m.click_share,
        m.purchase_share,
        m.rank_status,
        m.diagnostic,
        m.opportunity_score,
        m.category,
        m.asin_price,
        m.market_price,
      ])?;
    }
  }

  {
    let mut stmt = tx.prepare(
      "INSERT OR IGNORE INTO alerts (asin, year, quarter, seq, keyword, kind, week)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for a in alerts {
      stmt.execute(rusqlite::params![
        ledger.asin,
        ledger.year,
        ledger.quarter,
        a.seq,
        a.keyword,
        a.kind,
        a.week,
      ])?;
    }
  }

  tx.commit()
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = crate::Error;

  async fn load_ledger(&self, asin: &str, quarter: Quarter) -> Result<Option<KeywordLedger>> {
    let asin = asin.to_owned();
    let (year, number) = (quarter.year(), quarter.number());

    let rows = self
      .conn
      .call(move |conn| Ok(read_rows(conn, &asin, year, number)?))
      .await?;

    rows.map(LedgerRows::into_ledger).transpose()
  }

  async fn save_ledger(&self, ledger: &KeywordLedger) -> Result<()> {
    let rows = LedgerRows::from_ledger(ledger)?;
    let now = Utc::now().to_rfc3339();
    debug!(
      asin = ledger.asin(),
      quarter = %ledger.quarter(),
      week = ledger.last_recorded_week(),
      "saving ledger"
    );

    self
      .conn
      .call(move |conn| {
        write_rows(conn, &rows, &now)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_ledgers(&self, quarter: Quarter) -> Result<Vec<KeywordLedger>> {
    let (year, number) = (quarter.year(), quarter.number());

    let all: Vec<LedgerRows> = self
      .conn
      .call(move |conn| {
        let asins = conn
          .prepare("SELECT asin FROM ledgers WHERE year = ?1 AND quarter = ?2 ORDER BY asin")?
          .query_map(rusqlite::params![year, number], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::with_capacity(asins.len());
        for asin in asins {
          if let Some(rows) = read_rows(conn, &asin, year, number)? {
            out.push(rows);
          }
        }
        Ok(out)
      })
      .await?;

    all.into_iter().map(LedgerRows::into_ledger).collect()
  }
}
