use rusqlite::Connection;

use crate::domain::error::DomainError;

/// Idempotent schema setup. Runs on every connection because each
/// `:memory:` connection is its own database.
pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS positions (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            ticker TEXT NOT NULL UNIQUE,
            entry_price REAL NOT NULL,
            stop_loss REAL NOT NULL,
            take_profit REAL NOT NULL,
            date_entry TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS closed_trades (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            position_id TEXT,
            ticker TEXT NOT NULL,
            entry_price REAL NOT NULL,
            exit_price REAL NOT NULL,
            profit_percent REAL NOT NULL,
            date_entry TEXT NOT NULL,
            date_exit TEXT NOT NULL,
            reason TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS feature_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL,
            position_id TEXT,
            recorded_at TEXT NOT NULL,
            sentiment REAL NOT NULL,
            auth_score REAL NOT NULL,
            rsi REAL NOT NULL,
            score_tech REAL NOT NULL,
            volatility REAL NOT NULL,
            resultat INTEGER
        );

        CREATE TABLE IF NOT EXISTS equity_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at TEXT NOT NULL,
            total REAL NOT NULL,
            realized REAL NOT NULL,
            unrealized REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_samples_ticker ON feature_samples(ticker);
        CREATE INDEX IF NOT EXISTS idx_samples_position ON feature_samples(position_id);
        CREATE INDEX IF NOT EXISTS idx_closed_exit ON closed_trades(date_exit);
        ",
    )
    .map_err(|e| DomainError::Database(format!("Migration failed: {e}")))
}
