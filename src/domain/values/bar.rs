use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC observation over a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

/// Lookback window and bar interval requested from the market data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarWindow {
    /// Intraday timing: 10 days of hourly bars.
    Hourly,
    /// Coarse trend: 2 years of weekly bars.
    Weekly,
    /// Latest price: 1 day of 15-minute bars.
    Quote,
}

impl BarWindow {
    pub fn range(&self) -> &'static str {
        match self {
            BarWindow::Hourly => "10d",
            BarWindow::Weekly => "2y",
            BarWindow::Quote => "1d",
        }
    }

    pub fn interval(&self) -> &'static str {
        match self {
            BarWindow::Hourly => "60m",
            BarWindow::Weekly => "1wk",
            BarWindow::Quote => "15m",
        }
    }
}
