use crate::domain::values::features::FeatureVector;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A purchase proposal awaiting a yes/no command (confirm mode only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingConfirmation {
    pub ticker: String,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub features: FeatureVector,
    pub proposed_at: DateTime<Utc>,
}

impl PendingConfirmation {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.proposed_at > ttl
    }
}
