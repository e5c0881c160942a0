use crate::domain::error::DomainError;
use crate::domain::values::close_reason::CloseReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open trade. Prices are fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub ticker: String,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub date_entry: DateTime<Utc>,
}

impl Position {
    pub fn new(
        ticker: &str,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
        date_entry: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(DomainError::InvalidInput("ticker is empty".into()));
        }
        if !(stop_loss < entry_price && entry_price < take_profit) {
            return Err(DomainError::InvalidInput(format!(
                "{ticker}: expected stop_loss < entry < take_profit, got {stop_loss} / {entry_price} / {take_profit}"
            )));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticker,
            entry_price,
            stop_loss,
            take_profit,
            date_entry,
        })
    }

    /// Which exit threshold, if any, `price` has crossed.
    pub fn exit_trigger(&self, price: f64) -> Option<CloseReason> {
        if price >= self.take_profit {
            Some(CloseReason::TakeProfit)
        } else if price <= self.stop_loss {
            Some(CloseReason::StopLoss)
        } else {
            None
        }
    }

    pub fn profit_percent(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price * 100.0
    }
}
