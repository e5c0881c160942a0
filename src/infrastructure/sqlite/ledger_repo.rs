use crate::domain::entities::closed_trade::ClosedTrade;
use crate::domain::entities::equity::EquitySnapshot;
use crate::domain::entities::position::Position;
use crate::domain::error::DomainError;
use crate::domain::ports::ledger_repository::LedgerRepository;
use crate::domain::values::close_reason::CloseReason;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct SqliteLedgerRepo {
    conn: Mutex<Connection>,
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::PersistenceCorrupt(format!("bad timestamp '{raw}': {e}")))
}

struct PositionRow {
    id: String,
    ticker: String,
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    date_entry: String,
}

impl PositionRow {
    const COLUMNS: &'static str = "id, ticker, entry_price, stop_loss, take_profit, date_entry";

    fn read(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            ticker: row.get(1)?,
            entry_price: row.get(2)?,
            stop_loss: row.get(3)?,
            take_profit: row.get(4)?,
            date_entry: row.get(5)?,
        })
    }

    fn into_position(self) -> Result<Position, DomainError> {
        Ok(Position {
            date_entry: parse_time(&self.date_entry)?,
            id: self.id,
            ticker: self.ticker,
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
        })
    }
}

struct TradeRow {
    ticker: String,
    entry_price: f64,
    exit_price: f64,
    profit_percent: f64,
    date_entry: String,
    date_exit: String,
    reason: String,
}

impl TradeRow {
    fn read(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            ticker: row.get(0)?,
            entry_price: row.get(1)?,
            exit_price: row.get(2)?,
            profit_percent: row.get(3)?,
            date_entry: row.get(4)?,
            date_exit: row.get(5)?,
            reason: row.get(6)?,
        })
    }

    fn into_trade(self) -> Result<ClosedTrade, DomainError> {
        let reason: CloseReason = self
            .reason
            .parse()
            .map_err(DomainError::PersistenceCorrupt)?;
        Ok(ClosedTrade {
            date_entry: parse_time(&self.date_entry)?,
            date_exit: parse_time(&self.date_exit)?,
            ticker: self.ticker,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            profit_percent: self.profit_percent,
            reason,
        })
    }
}

/// Keep the readable rows and log the rest.
fn keep_valid<T>(what: &str, rows: Vec<Result<T, DomainError>>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|r| match r {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Skipping corrupt {what} row: {e}");
                None
            }
        })
        .collect()
}

impl SqliteLedgerRepo {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DomainError> {
        self.conn
            .lock()
            .map_err(|e| DomainError::Database(e.to_string()))
    }
}

impl LedgerRepository for SqliteLedgerRepo {
    fn open_position(&self, position: &Position) -> Result<(), DomainError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM positions WHERE ticker = ?1)",
            params![position.ticker],
            |r| r.get(0),
        )?;
        if exists {
            return Err(DomainError::DuplicateTicker(position.ticker.clone()));
        }
        tx.execute(
            "INSERT INTO positions (id, ticker, entry_price, stop_loss, take_profit, date_entry)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                position.id,
                position.ticker,
                position.entry_price,
                position.stop_loss,
                position.take_profit,
                position.date_entry.to_rfc3339(),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to open position: {e}")))?;
        tx.commit()?;
        debug!(ticker = %position.ticker, "Position stored");
        Ok(())
    }

    fn close_position(
        &self,
        ticker: &str,
        exit_price: f64,
        reason: CloseReason,
        date_exit: DateTime<Utc>,
    ) -> Result<(Position, ClosedTrade), DomainError> {
        let ticker = ticker.trim().to_uppercase();
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row = tx
            .query_row(
                &format!(
                    "SELECT {} FROM positions WHERE ticker = ?1",
                    PositionRow::COLUMNS
                ),
                params![ticker],
                PositionRow::read,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound(format!("No open position for {ticker}")))?;
        let position = row.into_position()?;
        let trade = ClosedTrade::from_position(&position, exit_price, reason, date_exit);

        tx.execute(
            "INSERT INTO closed_trades (position_id, ticker, entry_price, exit_price, profit_percent, date_entry, date_exit, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                position.id,
                trade.ticker,
                trade.entry_price,
                trade.exit_price,
                trade.profit_percent,
                trade.date_entry.to_rfc3339(),
                trade.date_exit.to_rfc3339(),
                trade.reason.to_string(),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to archive trade: {e}")))?;
        tx.execute("DELETE FROM positions WHERE ticker = ?1", params![ticker])?;
        tx.commit()?;
        Ok((position, trade))
    }

    fn get_position(&self, ticker: &str) -> Result<Option<Position>, DomainError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM positions WHERE ticker = ?1",
                    PositionRow::COLUMNS
                ),
                params![ticker.trim().to_uppercase()],
                PositionRow::read,
            )
            .optional()?;
        row.map(PositionRow::into_position).transpose()
    }

    fn list_positions(&self) -> Result<Vec<Position>, DomainError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM positions ORDER BY seq",
            PositionRow::COLUMNS
        ))?;
        let rows = stmt
            .query_map([], PositionRow::read)?
            .map(|r| r.map_err(DomainError::from).and_then(PositionRow::into_position))
            .collect();
        Ok(keep_valid("position", rows))
    }

    fn count_positions(&self) -> Result<usize, DomainError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM positions", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn list_closed_trades(&self) -> Result<Vec<ClosedTrade>, DomainError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT ticker, entry_price, exit_price, profit_percent, date_entry, date_exit, reason
             FROM closed_trades ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], TradeRow::read)?
            .map(|r| r.map_err(DomainError::from).and_then(TradeRow::into_trade))
            .collect();
        Ok(keep_valid("closed trade", rows))
    }

    fn append_equity(&self, snapshot: &EquitySnapshot) -> Result<(), DomainError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO equity_log (recorded_at, total, realized, unrealized) VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.recorded_at.to_rfc3339(),
                snapshot.total,
                snapshot.realized,
                snapshot.unrealized,
            ],
        )?;
        Ok(())
    }

    fn list_equity(&self) -> Result<Vec<EquitySnapshot>, DomainError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT recorded_at, total, realized, unrealized FROM equity_log ORDER BY seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .map(|r| -> Result<EquitySnapshot, DomainError> {
                let (at, total, realized, unrealized) = r?;
                Ok(EquitySnapshot {
                    recorded_at: parse_time(&at)?,
                    total,
                    realized,
                    unrealized,
                })
            })
            .collect();
        Ok(keep_valid("equity", rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite::migrations::run_migrations;

    fn repo() -> SqliteLedgerRepo {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        SqliteLedgerRepo::new(conn)
    }

    fn position(ticker: &str) -> Position {
        Position::new(ticker, 100.0, 95.0, 110.0, Utc::now()).unwrap()
    }

    #[test]
    fn test_open_then_close_moves_to_archive() {
        let repo = repo();
        repo.open_position(&position("AAPL")).unwrap();
        assert_eq!(repo.count_positions().unwrap(), 1);

        let (pos, trade) = repo
            .close_position("aapl", 110.0, CloseReason::TakeProfit, Utc::now())
            .unwrap();
        assert_eq!(pos.ticker, "AAPL");
        assert!((trade.profit_percent - 10.0).abs() < 1e-9);
        assert_eq!(repo.count_positions().unwrap(), 0);
        assert_eq!(repo.list_closed_trades().unwrap(), vec![trade]);
    }

    #[test]
    fn test_duplicate_open_rejected() {
        let repo = repo();
        repo.open_position(&position("NVDA")).unwrap();
        let err = repo.open_position(&position("NVDA")).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateTicker(_)));
        assert_eq!(repo.count_positions().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_rows_are_skipped() {
        let repo = repo();
        repo.open_position(&position("AMD")).unwrap();
        {
            let conn = repo.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO positions (id, ticker, entry_price, stop_loss, take_profit, date_entry)
                 VALUES ('x', 'BAD', 1.0, 0.5, 2.0, 'yesterday')",
                [],
            )
            .unwrap();
        }
        let positions = repo.list_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].ticker, "AMD");
    }
}
