use crate::domain::entities::closed_trade::ClosedTrade;
use crate::domain::entities::equity::EquitySnapshot;
use crate::domain::entities::position::Position;
use crate::domain::error::DomainError;
use crate::domain::ports::ledger_repository::LedgerRepository;
use crate::domain::values::close_reason::CloseReason;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Trades listed in the report body.
pub const RECENT_TRADES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub total_trades: usize,
    pub wins: usize,
    /// Includes flat trades.
    pub losses: usize,
    pub win_rate: f64,
    pub cumulative_percent: f64,
    pub recent: Vec<ClosedTrade>,
}

impl PerformanceReport {
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let cumulative_percent = trades.iter().map(|t| t.profit_percent).sum();
        let win_rate = if total_trades == 0 {
            0.0
        } else {
            wins as f64 / total_trades as f64 * 100.0
        };
        let recent = trades[total_trades.saturating_sub(RECENT_TRADES)..].to_vec();
        Self {
            total_trades,
            wins,
            losses: total_trades - wins,
            win_rate,
            cumulative_percent,
            recent,
        }
    }

    /// Message body with lightweight HTML markup.
    pub fn render(&self) -> String {
        if self.total_trades == 0 {
            return "📉 No closed trades yet.".to_string();
        }
        let details: String = self
            .recent
            .iter()
            .map(|t| {
                let icon = if t.is_win() { "✅" } else { "❌" };
                format!("{icon} {}: {:+.2}%\n", t.ticker, t.profit_percent)
            })
            .collect();
        format!(
            "📊 <b>PERFORMANCE REPORT</b>\n\
             ---------------------------\n\
             🔢 Total trades: {}\n\
             🏆 Won: {} | 🗑️ Lost: {}\n\
             🎯 <b>Win rate: {:.1}%</b>\n\
             📈 <b>Cumulative: {:.2}%</b>\n\
             ---------------------------\n\
             🕒 <i>Latest trades:</i>\n\
             {details}",
            self.total_trades, self.wins, self.losses, self.win_rate, self.cumulative_percent
        )
    }
}

pub struct LedgerUseCase {
    repo: Arc<dyn LedgerRepository>,
}

impl LedgerUseCase {
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    pub fn open(
        &self,
        ticker: &str,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
        date_entry: DateTime<Utc>,
    ) -> Result<Position, DomainError> {
        let position = Position::new(ticker, entry_price, stop_loss, take_profit, date_entry)?;
        self.repo.open_position(&position)?;
        info!(
            ticker = %position.ticker,
            entry = position.entry_price,
            stop = position.stop_loss,
            target = position.take_profit,
            "Position opened"
        );
        Ok(position)
    }

    pub fn close(
        &self,
        ticker: &str,
        exit_price: f64,
        reason: CloseReason,
    ) -> Result<(Position, ClosedTrade), DomainError> {
        let (position, trade) = self
            .repo
            .close_position(ticker, exit_price, reason, Utc::now())?;
        info!(
            ticker = %trade.ticker,
            exit = trade.exit_price,
            profit_pct = format!("{:.2}", trade.profit_percent),
            %reason,
            "Position closed"
        );
        Ok((position, trade))
    }

    /// True when the ledger is full.
    pub fn capacity(&self, max_positions: usize) -> Result<bool, DomainError> {
        Ok(self.repo.count_positions()? >= max_positions)
    }

    pub fn get(&self, ticker: &str) -> Result<Option<Position>, DomainError> {
        self.repo.get_position(ticker)
    }

    pub fn positions(&self) -> Result<Vec<Position>, DomainError> {
        self.repo.list_positions()
    }

    pub fn history(&self) -> Result<Vec<ClosedTrade>, DomainError> {
        self.repo.list_closed_trades()
    }

    pub fn report(&self) -> Result<PerformanceReport, DomainError> {
        Ok(PerformanceReport::from_trades(&self.history()?))
    }

    /// Append an equity point. Realized P&L sums `exit - entry` over the
    /// archive; unrealized sums `price - entry` over open positions, valuing a
    /// position at entry when no price is available.
    pub fn record_equity(&self, prices: &HashMap<String, f64>) -> Result<EquitySnapshot, DomainError> {
        let realized: f64 = self
            .history()?
            .iter()
            .map(|t| t.exit_price - t.entry_price)
            .sum();
        let unrealized: f64 = self
            .positions()?
            .iter()
            .map(|p| prices.get(&p.ticker).copied().unwrap_or(p.entry_price) - p.entry_price)
            .sum();
        let snapshot = EquitySnapshot {
            recorded_at: Utc::now(),
            total: realized + unrealized,
            realized,
            unrealized,
        };
        self.repo.append_equity(&snapshot)?;
        Ok(snapshot)
    }

    pub fn equity_curve(&self) -> Result<Vec<EquitySnapshot>, DomainError> {
        self.repo.list_equity()
    }
}
