use crate::domain::entities::closed_trade::ClosedTrade;
use crate::domain::entities::equity::EquitySnapshot;
use crate::domain::entities::position::Position;
use crate::domain::error::DomainError;
use crate::domain::values::close_reason::CloseReason;
use chrono::{DateTime, Utc};

/// Durable store for open positions, the closed-trade archive and the
/// equity curve.
///
/// `open_position` and `close_position` are each one atomic
/// read-modify-write against the store.
pub trait LedgerRepository: Send + Sync {
    /// Fails with `DuplicateTicker` when the ticker is already open.
    fn open_position(&self, position: &Position) -> Result<(), DomainError>;

    /// Archive and remove the open position. Fails with `NotFound` when absent.
    fn close_position(
        &self,
        ticker: &str,
        exit_price: f64,
        reason: CloseReason,
        date_exit: DateTime<Utc>,
    ) -> Result<(Position, ClosedTrade), DomainError>;

    fn get_position(&self, ticker: &str) -> Result<Option<Position>, DomainError>;

    /// Open positions in insertion order.
    fn list_positions(&self) -> Result<Vec<Position>, DomainError>;

    fn count_positions(&self) -> Result<usize, DomainError>;

    /// Closed trades in append order.
    fn list_closed_trades(&self) -> Result<Vec<ClosedTrade>, DomainError>;

    fn append_equity(&self, snapshot: &EquitySnapshot) -> Result<(), DomainError>;

    fn list_equity(&self) -> Result<Vec<EquitySnapshot>, DomainError>;
}
