//! Scored judgments derived from oracle responses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directional crowd sentiment around a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentJudgment {
    /// -1.0 (bearish) to 1.0 (bullish).
    pub sentiment: f64,
    /// Discussion volume, (0, 1].
    pub volume: f64,
    pub spam_ratio: f64,
    pub topic: String,
}

impl SentimentJudgment {
    /// Below this absolute sentiment the chatter is noise.
    pub const NOISE_THRESHOLD: f64 = 0.1;

    pub fn is_noise(&self) -> bool {
        self.sentiment.abs() < Self::NOISE_THRESHOLD
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrowdType {
    Retail,
    Bots,
    Mixed,
}

impl fmt::Display for CrowdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrowdType::Retail => write!(f, "RETAIL"),
            CrowdType::Bots => write!(f, "BOTS"),
            CrowdType::Mixed => write!(f, "MIXED"),
        }
    }
}

impl FromStr for CrowdType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retail" => Ok(CrowdType::Retail),
            "bots" | "bot" => Ok(CrowdType::Bots),
            "mixed" | "mixte" => Ok(CrowdType::Mixed),
            _ => Err(format!("Unknown crowd type: {s}")),
        }
    }
}

/// Organic-vs-bot judgment of the crowd discussing a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityJudgment {
    pub chaos: f64,
    pub context: f64,
    pub interaction: f64,
    pub crowd: CrowdType,
    pub explanation: Option<String>,
}

impl AuthenticityJudgment {
    /// Candidates scoring below this are rejected as bot-driven.
    pub const MIN_AUTHENTICITY: f64 = 0.45;

    /// Sum of the three 0–10 sub-scores over 30.
    pub fn score(&self) -> f64 {
        (self.chaos + self.context + self.interaction) / 30.0
    }

    pub fn is_organic(&self) -> bool {
        self.score() >= Self::MIN_AUTHENTICITY
    }
}
