use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point on the equity curve, in price units per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub recorded_at: DateTime<Utc>,
    pub total: f64,
    pub realized: f64,
    pub unrealized: f64,
}
