use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    TakeProfit,
    StopLoss,
}

impl CloseReason {
    /// Outcome label recorded in the dataset: take-profit is a win.
    pub fn outcome(&self) -> Outcome {
        match self {
            CloseReason::TakeProfit => Outcome::Win,
            CloseReason::StopLoss => Outcome::Loss,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            CloseReason::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

impl FromStr for CloseReason {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(' ', "_").as_str() {
            "TAKE_PROFIT" => Ok(CloseReason::TakeProfit),
            "STOP_LOSS" => Ok(CloseReason::StopLoss),
            _ => Err(format!("Unknown close reason: {s}")),
        }
    }
}

/// Realized outcome of a position, stored as 0/1 in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Loss,
    Win,
}

impl Outcome {
    pub fn label(&self) -> u8 {
        match self {
            Outcome::Loss => 0,
            Outcome::Win => 1,
        }
    }

    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Outcome::Loss),
            1 => Some(Outcome::Win),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Loss => write!(f, "loss"),
            Outcome::Win => write!(f, "win"),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win" | "1" => Ok(Outcome::Win),
            "loss" | "0" => Ok(Outcome::Loss),
            _ => Err(format!("Unknown outcome: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_parses_legacy_spelling() {
        assert_eq!("TAKE PROFIT".parse::<CloseReason>().unwrap(), CloseReason::TakeProfit);
        assert_eq!("stop_loss".parse::<CloseReason>().unwrap(), CloseReason::StopLoss);
    }

    #[test]
    fn test_reason_outcome() {
        assert_eq!(CloseReason::TakeProfit.outcome().label(), 1);
        assert_eq!(CloseReason::StopLoss.outcome().label(), 0);
        assert_eq!(Outcome::from_label(2), None);
    }
}
