//! SQL schema for the tracker's SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout version for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS ledgers (
    asin       TEXT    NOT NULL,
    year       INTEGER NOT NULL,
    quarter    INTEGER NOT NULL CHECK (quarter BETWEEN 1 AND 4),
    sku        TEXT,
    last_week  INTEGER NOT NULL DEFAULT 0 CHECK (last_week BETWEEN 0 AND 13),
    created_at TEXT    NOT NULL,   -- RFC 3339 UTC
    updated_at TEXT    NOT NULL,
    PRIMARY KEY (asin, year, quarter)
);

-- The locked keyword set. Ranks never change once written; only the
-- placement flags are updated.
CREATE TABLE IF NOT EXISTS tracked_keywords (
    asin       TEXT    NOT NULL,
    year       INTEGER NOT NULL,
    quarter    INTEGER NOT NULL,
    rank       INTEGER NOT NULL,
    keyword    TEXT    NOT NULL,
    in_title   INTEGER NOT NULL DEFAULT 0,
    in_backend INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (asin, year, quarter, rank),
    UNIQUE (asin, year, quarter, keyword),
    FOREIGN KEY (asin, year, quarter) REFERENCES ledgers(asin, year, quarter)
);

-- Weekly history is append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS weekly_metrics (
    asin              TEXT    NOT NULL,
    year              INTEGER NOT NULL,
    quarter           INTEGER NOT NULL,
    rank              INTEGER NOT NULL,
    week              INTEGER NOT NULL CHECK (week BETWEEN 1 AND 13),
    search_volume     INTEGER NOT NULL,
    impression_share  REAL    NOT NULL,
    click_share       REAL    NOT NULL,
    purchase_share    REAL    NOT NULL,
    rank_status       TEXT    NOT NULL,   -- 'top_3' | 'page_1_high' | 'page_1_low' | 'invisible'
    diagnostic        TEXT    NOT NULL,   -- 'ghost' | 'window_shopper' | 'price_problem' | 'healthy'
    opportunity_score REAL    NOT NULL,
    category          TEXT    NOT NULL,   -- 'bread_butter' | 'opportunity' | 'leak' | 'uncategorized'
    asin_price        REAL,
    market_price      REAL,
    PRIMARY KEY (asin, year, quarter, rank, week),
    FOREIGN KEY (asin, year, quarter, rank)
      REFERENCES tracked_keywords(asin, year, quarter, rank)
);

-- Alerts are append-only; seq is the alert's position in the ledger.
CREATE TABLE IF NOT EXISTS alerts (
    asin    TEXT    NOT NULL,
    year    INTEGER NOT NULL,
    quarter INTEGER NOT NULL,
    seq     INTEGER NOT NULL,
    keyword TEXT    NOT NULL,
    kind    TEXT    NOT NULL,   -- 'dropped_from_title' | 'dropped_from_backend'
    week    INTEGER NOT NULL,
    PRIMARY KEY (asin, year, quarter, seq),
    FOREIGN KEY (asin, year, quarter) REFERENCES ledgers(asin, year, quarter)
);

CREATE INDEX IF NOT EXISTS ledgers_quarter_idx ON ledgers(year, quarter);

PRAGMA user_version = 1;
";
