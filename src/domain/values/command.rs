//! Inbound command tokens received from the notification channel.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ticker", rename_all = "lowercase")]
pub enum Command {
    /// Confirm a pending proposal and open the position.
    Confirm(String),
    /// Discard a pending proposal.
    Reject(String),
    /// Emit the ledger performance report.
    Report,
}

impl Command {
    /// Parse a raw message. Unrecognized text yields `None` and is ignored.
    pub fn parse(raw: &str) -> Option<Command> {
        let text = raw.trim().to_uppercase();
        if matches!(text.as_str(), "STATS" | "BILAN" | "STATISTIQUES") {
            return Some(Command::Report);
        }

        let mut parts = text.split_whitespace();
        let action = parts.next()?;
        let ticker = parts.next()?.trim_start_matches('$').to_string();
        if ticker.is_empty() {
            return None;
        }

        match action {
            "ACHAT" | "BUY" | "OUI" | "YES" => Some(Command::Confirm(ticker)),
            "NON" | "NO" => Some(Command::Reject(ticker)),
            _ => None,
        }
    }
}
