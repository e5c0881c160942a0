use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scan mode, chosen from ledger capacity at the start of each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Capacity remains: volatility screener, positions may be opened.
    Hunt,
    /// Ledger full: diversification screener, ideas only.
    Watch,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Hunt => write!(f, "hunt"),
            ScanMode::Watch => write!(f, "watch"),
        }
    }
}

/// What a qualified hunt-mode candidate turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationMode {
    /// Open the position immediately.
    Auto,
    /// Park a pending proposal and ask the user.
    Confirm,
}

impl fmt::Display for ConfirmationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationMode::Auto => write!(f, "auto"),
            ConfirmationMode::Confirm => write!(f, "confirm"),
        }
    }
}

impl FromStr for ConfirmationMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "autonomous" => Ok(ConfirmationMode::Auto),
            "confirm" | "semi" | "semi-auto" => Ok(ConfirmationMode::Confirm),
            _ => Err(format!("Unknown confirmation mode: {s}")),
        }
    }
}
