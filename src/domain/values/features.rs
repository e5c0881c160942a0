use serde::{Deserialize, Serialize};

/// Decision-time features fed to the outcome predictor.
///
/// Column order is part of the trained model: [`FeatureVector::NAMES`] is
/// stored with every model and checked again at inference time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub sentiment: f64,
    pub auth_score: f64,
    pub rsi: f64,
    pub score_tech: f64,
    /// Distance to take-profit relative to entry: `(take_profit - entry) / entry`.
    pub volatility: f64,
}

impl FeatureVector {
    pub const NAMES: [&'static str; 5] = ["sentiment", "auth_score", "rsi", "score_tech", "volatility"];

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.sentiment,
            self.auth_score,
            self.rsi,
            self.score_tech,
            self.volatility,
        ]
    }

    pub fn names() -> Vec<String> {
        Self::NAMES.iter().map(|n| n.to_string()).collect()
    }

    pub fn volatility_ratio(entry: f64, take_profit: f64) -> f64 {
        if entry > 0.0 {
            (take_profit - entry) / entry
        } else {
            0.0
        }
    }
}
