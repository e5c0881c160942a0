use crate::domain::error::DomainError;
use crate::domain::ports::market_data::MarketData;
use crate::domain::values::bar::{Bar, BarWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// OHLC bars from the Yahoo Finance v8 chart API (no auth required).
pub struct YahooMarketData {
    client: reqwest::Client,
    base_url: String,
}

impl Default for YahooMarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooMarketData {
    pub fn new() -> Self {
        Self::with_base_url(CHART_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                     AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/120.0.0.0 Safari/537.36",
                )
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, serde::Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, serde::Deserialize)]
struct Indicators {
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Turn a chart payload into bars, dropping slots with any missing field.
fn parse_chart(ticker: &str, body: &str) -> Result<Vec<Bar>, DomainError> {
    let data: ChartResponse = serde_json::from_str(body)
        .map_err(|e| DomainError::DataUnavailable(format!("{ticker}: bad chart payload: {e}")))?;

    if let Some(err) = data.chart.error.filter(|e| !e.is_null()) {
        return Err(DomainError::DataUnavailable(format!("{ticker}: Yahoo error: {err}")));
    }

    let chart = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DomainError::DataUnavailable(format!("{ticker}: empty chart")))?;
    let quote = chart.indicators.quote.into_iter().next().unwrap_or_default();

    let bars = chart
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let at = |v: &[Option<f64>]| v.get(i).copied().flatten();
            let timestamp = DateTime::<Utc>::from_timestamp(ts, 0)?;
            Some(Bar::new(
                timestamp,
                at(&quote.open)?,
                at(&quote.high)?,
                at(&quote.low)?,
                at(&quote.close)?,
            ))
        })
        .collect();
    Ok(bars)
}

#[async_trait]
impl MarketData for YahooMarketData {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn bars(&self, ticker: &str, window: BarWindow) -> Result<Vec<Bar>, DomainError> {
        let url = format!(
            "{}/{ticker}?range={}&interval={}",
            self.base_url,
            window.range(),
            window.interval()
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("{ticker}: {e}")))?;

        if !resp.status().is_success() {
            return Err(DomainError::DataUnavailable(format!(
                "Yahoo API returned {} for {ticker}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("{ticker}: {e}")))?;
        let bars = parse_chart(ticker, &body)?;
        debug!(ticker, ?window, count = bars.len(), "Bars fetched");
        Ok(bars)
    }
}
