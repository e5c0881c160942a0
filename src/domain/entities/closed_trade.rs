use crate::domain::entities::position::Position;
use crate::domain::values::close_reason::CloseReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Archive record written exactly once when a position is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub ticker: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub profit_percent: f64,
    pub date_entry: DateTime<Utc>,
    pub date_exit: DateTime<Utc>,
    pub reason: CloseReason,
}

impl ClosedTrade {
    pub fn from_position(
        position: &Position,
        exit_price: f64,
        reason: CloseReason,
        date_exit: DateTime<Utc>,
    ) -> Self {
        Self {
            ticker: position.ticker.clone(),
            entry_price: position.entry_price,
            exit_price,
            profit_percent: position.profit_percent(exit_price),
            date_entry: position.date_entry,
            date_exit,
            reason,
        }
    }

    /// Strictly positive profit. A flat trade counts as a loss.
    pub fn is_win(&self) -> bool {
        self.profit_percent > 0.0
    }
}
