use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete timing signal produced by the indicator engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TechSignal {
    StrongBuy,
    Buy,
    BuyDip,
    Neutral,
    Wait,
}

impl TechSignal {
    /// STRONG_BUY, BUY and BUY_DIP all qualify for a purchase decision.
    pub fn is_buy(&self) -> bool {
        matches!(self, TechSignal::StrongBuy | TechSignal::Buy | TechSignal::BuyDip)
    }
}

impl fmt::Display for TechSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechSignal::StrongBuy => write!(f, "STRONG_BUY"),
            TechSignal::Buy => write!(f, "BUY"),
            TechSignal::BuyDip => write!(f, "BUY_DIP"),
            TechSignal::Neutral => write!(f, "NEUTRAL"),
            TechSignal::Wait => write!(f, "WAIT"),
        }
    }
}

impl FromStr for TechSignal {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STRONG_BUY" => Ok(TechSignal::StrongBuy),
            "BUY" => Ok(TechSignal::Buy),
            "BUY_DIP" => Ok(TechSignal::BuyDip),
            "NEUTRAL" => Ok(TechSignal::Neutral),
            "WAIT" => Ok(TechSignal::Wait),
            _ => Err(format!("Unknown signal: {s}")),
        }
    }
}
