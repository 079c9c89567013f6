//! SQLite storage for daily bars.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, TransactionBehavior};

use crate::bar::StockDailyBar;
use crate::config::DbConfig;
use crate::error::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database not configured: {0}")]
    NotConfigured(#[from] ConfigError),
}

impl DbError {
    /// Whether reconnecting may help. A missing database name will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }
}

/// How long a writer waits on another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub const CREATE_STOCK_DATA: &str = "CREATE TABLE IF NOT EXISTS stock_data (
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    volume INTEGER,
    PRIMARY KEY (symbol, date)
)";

const INSERT_BAR: &str = "INSERT INTO stock_data (symbol, date, open, high, low, close, volume)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(symbol, date) DO NOTHING";

/// Result of inserting one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key existed; the stored row was left as it was.
    AlreadyPresent,
}

pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open the database a [`DbConfig`] points at, creating the file if needed.
    ///
    /// The directory must already exist; a missing one is reported as a
    /// (retryable) SQLite open failure.
    pub fn connect(cfg: &DbConfig) -> Result<Self, DbError> {
        let path = cfg.path()?;
        Self::open(path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::configure(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self, DbError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        // Reading the header makes a corrupt or foreign file fail here, inside
        // the connect retry, instead of at the first statement.
        let _: i64 = conn.pragma_query_value(None, "schema_version", |row| row.get(0))?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for tests).
    #[doc(hidden)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Create `stock_data` if absent. Safe to run repeatedly and concurrently.
    pub fn ensure_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(CREATE_STOCK_DATA)?;
        Ok(())
    }

    /// Insert one bar in its own transaction.
    ///
    /// An existing `(symbol, date)` row wins: nothing is overwritten. If the
    /// statement fails the transaction is rolled back on drop, leaving every
    /// previously committed row intact.
    pub fn insert_bar(&mut self, bar: &StockDailyBar) -> Result<InsertOutcome, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            INSERT_BAR,
            params![
                bar.symbol,
                bar.date.format("%Y-%m-%d").to_string(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
            ],
        )?;
        tx.commit()?;
        Ok(if changed == 0 {
            InsertOutcome::AlreadyPresent
        } else {
            InsertOutcome::Inserted
        })
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), DbError> {
        self.conn.close().map_err(|(_, e)| DbError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.ensure_schema().expect("ensure schema");
        db
    }

    fn temp_dir(tag: &str) -> PathBuf {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "stockpipe-db-{}-{}-{}",
            tag,
            std::process::id(),
            SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn bar(date: &str, close: f64) -> StockDailyBar {
        StockDailyBar {
            symbol: "IBM".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close,
            volume: 1000,
        }
    }

    fn stored_close(db: &Db, date: &str) -> Option<f64> {
        db.conn
            .query_row(
                "SELECT close FROM stock_data WHERE symbol = 'IBM' AND date = ?1",
                [date],
                |row| row.get(0),
            )
            .ok()
    }

    fn row_count(db: &Db) -> i64 {
        db.conn
            .query_row("SELECT COUNT(*) FROM stock_data", [], |row| row.get(0))
            .expect("count rows")
    }

    #[test]
    fn ensure_schema_idempotent() {
        let db = open_test_db();
        db.ensure_schema().expect("second ensure");
        db.ensure_schema().expect("third ensure");
        assert_eq!(row_count(&db), 0);
    }

    #[test]
    fn schema_has_composite_primary_key() {
        let db = open_test_db();
        let mut stmt = db.conn.prepare("PRAGMA table_info(stock_data)").unwrap();
        let pk: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(5)?)))
            .unwrap()
            .filter_map(|r| r.ok())
            .filter(|(_, pk)| *pk > 0)
            .collect();
        assert_eq!(pk, vec![("symbol".to_string(), 1), ("date".to_string(), 2)]);
    }

    #[test]
    fn insert_then_duplicate_is_noop() {
        let mut db = open_test_db();
        assert_eq!(db.insert_bar(&bar("2024-01-02", 100.5)).unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            db.insert_bar(&bar("2024-01-02", 100.5)).unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(row_count(&db), 1);
    }

    #[test]
    fn existing_row_is_not_overwritten() {
        let mut db = open_test_db();
        db.insert_bar(&bar("2024-01-02", 100.5)).unwrap();
        db.insert_bar(&bar("2024-01-02", 555.0)).unwrap();
        assert_eq!(stored_close(&db, "2024-01-02"), Some(100.5));
    }

    #[test]
    fn dates_stored_as_iso_text() {
        let mut db = open_test_db();
        db.insert_bar(&bar("2024-01-02", 1.0)).unwrap();
        let date: String = db
            .conn
            .query_row("SELECT date FROM stock_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(date, "2024-01-02");
    }

    #[test]
    fn failed_insert_leaves_earlier_rows() {
        let mut db = open_test_db();
        db.insert_bar(&bar("2024-01-02", 1.0)).unwrap();
        db.conn
            .execute_batch("CREATE TRIGGER reject_jan3 BEFORE INSERT ON stock_data
                 WHEN NEW.date = '2024-01-03'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;")
            .unwrap();
        assert!(db.insert_bar(&bar("2024-01-03", 2.0)).is_err());
        db.insert_bar(&bar("2024-01-04", 3.0)).unwrap();
        assert_eq!(row_count(&db), 2);
        assert_eq!(stored_close(&db, "2024-01-03"), None);
    }

    #[test]
    fn connect_creates_file_and_persists_across_connections() {
        let dir = temp_dir("persist");
        let cfg = DbConfig::new(dir.to_string_lossy(), "market");
        {
            let mut db = Db::connect(&cfg).unwrap();
            db.ensure_schema().unwrap();
            db.insert_bar(&bar("2024-01-02", 1.0)).unwrap();
            db.close().unwrap();
        }
        assert!(dir.join("market.sqlite").exists());
        let db = Db::connect(&cfg).unwrap();
        assert_eq!(row_count(&db), 1);
    }

    #[test]
    fn missing_directory_is_transient() {
        let dir = temp_dir("missing").join("does-not-exist");
        let err = Db::connect(&DbConfig::new(dir.to_string_lossy(), "market")).err().unwrap();
        assert!(matches!(err, DbError::Sqlite(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn foreign_file_fails_at_connect() {
        let dir = temp_dir("garbage");
        let path = dir.join("market.sqlite");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();
        assert!(Db::open(&path).is_err());
    }

    #[test]
    fn missing_name_is_not_transient() {
        let cfg = DbConfig {
            name: None,
            host: "data".to_string(),
        };
        let err = Db::connect(&cfg).err().unwrap();
        assert!(matches!(err, DbError::NotConfigured(_)));
        assert!(!err.is_transient());
    }
}
