//! Sentiment and authenticity filter.
//!
//! Wraps the text oracle with fixed prompt templates and turns its replies
//! into validated judgments. Any reply that does not parse, misses a field or
//! carries an out-of-range value is `DataUnavailable`; it never defaults to a
//! passing score.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::error::DomainError;
use crate::domain::ports::oracle::Oracle;
use crate::domain::values::judgment::{AuthenticityJudgment, CrowdType, SentimentJudgment};
use crate::domain::values::mode::ScanMode;

const HUNT_TEMPERATURE: f32 = 0.7;
const WATCH_TEMPERATURE: f32 = 0.6;
const ANALYSIS_TEMPERATURE: f32 = 0.2;

pub fn hunt_screen_prompt() -> String {
    "MARKET SCREENER.\n\
     You are a professional market screener. List 8 to 10 US stocks showing unusually \
     high volatility or abnormal volume TODAY.\n\
     Criteria:\n\
     1. Focus on current hype, breakouts or fresh earnings.\n\
     2. Size does not matter; large caps are fine if they move hard.\n\
     3. Exclude penny stocks (< $5).\n\
     Strict JSON: { \"tickers\": [\"SYMBOL1\", \"SYMBOL2\"] }"
        .to_string()
}

pub fn watch_screen_prompt() -> String {
    "DIVERSIFICATION SCREENER.\n\
     You are a portfolio diversification expert. The technology sector is saturated. \
     Find 5 interesting stocks in OTHER sectors (healthcare, energy, industrials, \
     consumer staples, financials).\n\
     Criteria:\n\
     1. Completely exclude technology, AI and semiconductors.\n\
     2. Prefer solid setups or undervalued names (value investing).\n\
     3. Profitable companies or sector leaders (e.g. Coca-Cola, Pfizer, Caterpillar).\n\
     Strict JSON: { \"tickers\": [\"SYMBOL1\", \"SYMBOL2\"] }"
        .to_string()
}

pub fn sentiment_prompt(ticker: &str) -> String {
    format!(
        "SENTIMENT ANALYSIS of recent posts about ${ticker}.\n\
         1. Estimate discussion VOLUME (0.1 to 1.0).\n\
         2. Score SENTIMENT (-1.0 to 1.0).\n\
         3. Separate out SPAM.\n\
         JSON format:\n\
         {{\n  \"spam_ratio\": float 0.0-1.0,\n  \"sentiment_score\": float -1.0-1.0,\n  \
         \"volume_score\": float 0.1-1.0,\n  \"main_topic\": \"short summary\"\n}}"
    )
}

pub fn authenticity_prompt(ticker: &str, topic: &str) -> String {
    format!(
        "AUTHENTICITY CHECK of posts about ${ticker} (topic: {topic}).\n\
         Goal: decide whether these are REAL HUMANS or BOTS.\n\
         Score each out of 10:\n\
         1. LINGUISTIC CHAOS (humans are messy, use slang).\n\
         2. CONTEXTUAL SPECIFICITY (humans give precise details).\n\
         3. INTERACTION DENSITY (humans reply and argue).\n\
         Return JSON:\n\
         {{\n  \"chaos_score\": int 0-10,\n  \"context_score\": int 0-10,\n  \
         \"interaction_score\": int 0-10,\n  \"crowd_type\": \"Retail\" | \"Bots\" | \"Mixed\",\n  \
         \"explanation\": \"why\"\n}}"
    )
}

/// Pull the JSON payload out of a reply that may be fenced or prefixed with
/// prose. The payload runs from the first opening bracket to the matching
/// last closing bracket.
pub fn extract_json(text: &str) -> Result<serde_json::Value, DomainError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned
        .find(['{', '['])
        .ok_or_else(|| DomainError::DataUnavailable("no JSON in oracle reply".into()))?;
    let closer = if cleaned[start..].starts_with('{') { '}' } else { ']' };
    let end = cleaned
        .rfind(closer)
        .filter(|&end| end > start)
        .ok_or_else(|| DomainError::DataUnavailable("unterminated JSON in oracle reply".into()))?;

    serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| DomainError::DataUnavailable(format!("malformed oracle JSON: {e}")))
}

/// Ticker list from a screener reply: either a bare array or an object whose
/// first array-valued field holds the tickers.
pub fn parse_ticker_list(text: &str) -> Result<Vec<String>, DomainError> {
    let value = extract_json(text)?;
    let items = match &value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map
            .values()
            .find_map(|v| v.as_array())
            .ok_or_else(|| DomainError::DataUnavailable("screener reply holds no list".into()))?,
        _ => {
            return Err(DomainError::DataUnavailable(
                "screener reply is not a list".into(),
            ))
        }
    };

    let mut tickers: Vec<String> = Vec::new();
    for item in items {
        let Some(raw) = item.as_str() else { continue };
        let ticker = raw.trim().trim_start_matches('$').to_uppercase();
        if ticker.is_empty() || tickers.contains(&ticker) {
            continue;
        }
        tickers.push(ticker);
    }
    Ok(tickers)
}

#[derive(Deserialize)]
struct RawSentiment {
    #[serde(alias = "sentiment_score")]
    sentiment: f64,
    #[serde(alias = "volume_score")]
    volume: f64,
    spam_ratio: f64,
    #[serde(alias = "main_topic", alias = "sujet_principal")]
    topic: String,
}

pub fn parse_sentiment(text: &str) -> Result<SentimentJudgment, DomainError> {
    let raw: RawSentiment = serde_json::from_value(extract_json(text)?)
        .map_err(|e| DomainError::DataUnavailable(format!("sentiment reply: {e}")))?;

    if !(-1.0..=1.0).contains(&raw.sentiment) {
        return Err(DomainError::DataUnavailable(format!(
            "sentiment out of range: {}",
            raw.sentiment
        )));
    }
    if !(raw.volume > 0.0 && raw.volume <= 1.0) {
        return Err(DomainError::DataUnavailable(format!(
            "volume out of range: {}",
            raw.volume
        )));
    }
    if !(0.0..=1.0).contains(&raw.spam_ratio) {
        return Err(DomainError::DataUnavailable(format!(
            "spam ratio out of range: {}",
            raw.spam_ratio
        )));
    }

    Ok(SentimentJudgment {
        sentiment: raw.sentiment,
        volume: raw.volume,
        spam_ratio: raw.spam_ratio,
        topic: raw.topic,
    })
}

#[derive(Deserialize)]
struct RawAuthenticity {
    #[serde(alias = "chaos_score", alias = "note_chaos")]
    chaos: f64,
    #[serde(alias = "context_score", alias = "note_contexte")]
    context: f64,
    #[serde(alias = "interaction_score", alias = "note_interaction")]
    interaction: f64,
    #[serde(alias = "type_foule")]
    crowd_type: String,
    #[serde(default, alias = "explication")]
    explanation: Option<String>,
}

pub fn parse_authenticity(text: &str) -> Result<AuthenticityJudgment, DomainError> {
    let raw: RawAuthenticity = serde_json::from_value(extract_json(text)?)
        .map_err(|e| DomainError::DataUnavailable(format!("authenticity reply: {e}")))?;

    for (name, v) in [
        ("chaos", raw.chaos),
        ("context", raw.context),
        ("interaction", raw.interaction),
    ] {
        if !(0.0..=10.0).contains(&v) {
            return Err(DomainError::DataUnavailable(format!(
                "{name} score out of range: {v}"
            )));
        }
    }
    let crowd: CrowdType = raw
        .crowd_type
        .parse()
        .map_err(DomainError::DataUnavailable)?;

    Ok(AuthenticityJudgment {
        chaos: raw.chaos,
        context: raw.context,
        interaction: raw.interaction,
        crowd,
        explanation: raw.explanation,
    })
}

pub struct SentimentFilter {
    oracle: Arc<dyn Oracle>,
}

impl SentimentFilter {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Candidate tickers for the given mode.
    pub async fn screen(&self, mode: ScanMode) -> Result<Vec<String>, DomainError> {
        let (prompt, temperature) = match mode {
            ScanMode::Hunt => (hunt_screen_prompt(), HUNT_TEMPERATURE),
            ScanMode::Watch => (watch_screen_prompt(), WATCH_TEMPERATURE),
        };
        let reply = self.oracle.complete(&prompt, temperature).await?;
        let tickers = parse_ticker_list(&reply).inspect_err(|e| {
            warn!(oracle = self.oracle.name(), %mode, "Screener reply rejected: {e}");
        })?;
        debug!(%mode, count = tickers.len(), "Screener candidates");
        Ok(tickers)
    }

    pub async fn sentiment(&self, ticker: &str) -> Result<SentimentJudgment, DomainError> {
        let reply = self
            .oracle
            .complete(&sentiment_prompt(ticker), ANALYSIS_TEMPERATURE)
            .await?;
        parse_sentiment(&reply)
    }

    pub async fn authenticity(
        &self,
        ticker: &str,
        topic: &str,
    ) -> Result<AuthenticityJudgment, DomainError> {
        let reply = self
            .oracle
            .complete(&authenticity_prompt(ticker, topic), ANALYSIS_TEMPERATURE)
            .await?;
        parse_authenticity(&reply)
    }
}
