//! Shared test helpers: scripted collaborators and an in-memory bot.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use huntbot::config::BotConfig;
use huntbot::domain::error::DomainError;
use huntbot::domain::ports::market_data::MarketData;
use huntbot::domain::ports::notifier::Notifier;
use huntbot::domain::ports::oracle::Oracle;
use huntbot::domain::ports::predictor::Predictor;
use huntbot::domain::values::bar::{Bar, BarWindow};
use huntbot::domain::values::close_reason::Outcome;
use huntbot::domain::values::features::FeatureVector;
use huntbot::infrastructure::ml::forest_predictor::ForestPredictor;
use huntbot::HuntBot;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub fn bars_from(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2025, 1, 2, 14, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(start + Duration::hours(i as i64), c, c + 0.5, c - 0.5, c))
        .collect()
}

/// Uptrend followed by `flat` bars with high = low = close, as a halted
/// ticker prints.
pub fn halted_bars(flat: usize) -> Vec<Bar> {
    let mut bars = bars_from(&uptrend_closes());
    let last = *bars.last().unwrap();
    for k in 1..=flat {
        let c = last.close;
        bars.push(Bar::new(last.timestamp + Duration::hours(k as i64), c, c, c, c));
    }
    bars
}

/// Rising zig-zag (+2 / -1.5): close above both averages, RSI in the 50s.
pub fn uptrend_closes() -> Vec<f64> {
    let mut closes = vec![100.0];
    for i in 1..120 {
        let step = if i % 2 == 1 { 2.0 } else { -1.5 };
        closes.push(closes[i - 1] + step);
    }
    closes
}

/// Steep zig-zag (+3 / -0.5): RSI well above 70.
pub fn overbought_closes() -> Vec<f64> {
    let mut closes = vec![100.0];
    for i in 1..80 {
        let step = if i % 2 == 1 { 3.0 } else { -0.5 };
        closes.push(closes[i - 1] + step);
    }
    closes
}

/// Serves the uptrend for every ticker unless overridden. Quotes come from
/// `set_price`; a ticker without one has no quote.
#[derive(Default)]
pub struct FakeMarket {
    hourly: Mutex<HashMap<String, Vec<f64>>>,
    hourly_bars: Mutex<HashMap<String, Vec<Bar>>>,
    prices: Mutex<HashMap<String, f64>>,
}

impl FakeMarket {
    pub fn set_hourly(&self, ticker: &str, closes: Vec<f64>) {
        self.hourly.lock().unwrap().insert(ticker.to_string(), closes);
    }

    /// Serve exact bars, for windows `set_hourly` cannot express.
    pub fn set_hourly_bars(&self, ticker: &str, bars: Vec<Bar>) {
        self.hourly_bars.lock().unwrap().insert(ticker.to_string(), bars);
    }

    pub fn set_price(&self, ticker: &str, price: f64) {
        self.prices.lock().unwrap().insert(ticker.to_string(), price);
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    fn name(&self) -> &str {
        "fake_market"
    }

    async fn bars(&self, ticker: &str, window: BarWindow) -> Result<Vec<Bar>, DomainError> {
        match window {
            BarWindow::Hourly => {
                if let Some(bars) = self.hourly_bars.lock().unwrap().get(ticker) {
                    return Ok(bars.clone());
                }
                let closes = self
                    .hourly
                    .lock()
                    .unwrap()
                    .get(ticker)
                    .cloned()
                    .unwrap_or_else(uptrend_closes);
                Ok(bars_from(&closes))
            }
            BarWindow::Weekly => Ok(bars_from(&uptrend_closes()[..40])),
            BarWindow::Quote => Ok(self
                .prices
                .lock()
                .unwrap()
                .get(ticker)
                .map(|&p| bars_from(&[p]))
                .unwrap_or_default()),
        }
    }
}

pub const ORGANIC: &str = r#"{"chaos_score": 8, "context_score": 7, "interaction_score": 6, "crowd_type": "Retail", "explanation": "messy humans"}"#;
pub const BOTS: &str = r#"{"chaos_score": 1, "context_score": 2, "interaction_score": 1, "crowd_type": "Bots"}"#;
pub const BULLISH: &str = r#"```json
{"spam_ratio": 0.1, "sentiment_score": 0.6, "volume_score": 0.8, "main_topic": "Earnings beat"}
```"#;

/// Replies by prompt header. Per-ticker sentiment and authenticity replies
/// can be overridden.
pub struct FakeOracle {
    pub hunt_reply: Mutex<String>,
    pub watch_reply: Mutex<String>,
    sentiment: Mutex<HashMap<String, String>>,
    authenticity: Mutex<HashMap<String, String>>,
    failing_screens: Mutex<usize>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeOracle {
    pub fn new(hunt: &[&str], watch: &[&str]) -> Self {
        Self {
            hunt_reply: Mutex::new(serde_json::json!({ "tickers": hunt }).to_string()),
            watch_reply: Mutex::new(serde_json::json!({ "tickers": watch }).to_string()),
            sentiment: Mutex::new(HashMap::new()),
            authenticity: Mutex::new(HashMap::new()),
            failing_screens: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn set_sentiment(&self, ticker: &str, reply: &str) {
        self.sentiment.lock().unwrap().insert(ticker.to_string(), reply.to_string());
    }

    pub fn set_authenticity(&self, ticker: &str, reply: &str) {
        self.authenticity.lock().unwrap().insert(ticker.to_string(), reply.to_string());
    }

    /// The next `n` screener calls fail as if the service were down.
    pub fn fail_next_screens(&self, n: usize) {
        *self.failing_screens.lock().unwrap() = n;
    }

    pub fn count(&self, header: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(header))
            .count()
    }

    fn per_ticker(map: &Mutex<HashMap<String, String>>, prompt: &str, default: &str) -> String {
        let ticker: String = prompt
            .split('$')
            .nth(1)
            .map(|s| s.chars().take_while(|c| c.is_ascii_alphanumeric()).collect())
            .unwrap_or_default();
        map.lock()
            .unwrap()
            .get(&ticker)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    fn name(&self) -> &str {
        "fake_oracle"
    }

    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.starts_with("MARKET SCREENER.") || prompt.starts_with("DIVERSIFICATION SCREENER.") {
            let mut failing = self.failing_screens.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(DomainError::DataUnavailable("oracle offline".into()));
            }
        }
        let reply = if prompt.starts_with("MARKET SCREENER.") {
            self.hunt_reply.lock().unwrap().clone()
        } else if prompt.starts_with("DIVERSIFICATION SCREENER.") {
            self.watch_reply.lock().unwrap().clone()
        } else if prompt.starts_with("SENTIMENT ANALYSIS") {
            Self::per_ticker(&self.sentiment, prompt, BULLISH)
        } else if prompt.starts_with("AUTHENTICITY CHECK") {
            Self::per_ticker(&self.authenticity, prompt, ORGANIC)
        } else {
            return Err(DomainError::DataUnavailable("unexpected prompt".into()));
        };
        Ok(reply)
    }
}

/// Records outbound messages and serves queued inbound ones once.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    inbox: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn push_command(&self, text: &str) {
        self.inbox.lock().unwrap().push(text.to_string());
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<String>, DomainError> {
        Ok(std::mem::take(&mut *self.inbox.lock().unwrap()))
    }
}

/// Always returns the same probability.
pub struct FixedPredictor(pub Option<f64>);

impl Predictor for FixedPredictor {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fit(&self, _samples: &[(FeatureVector, Outcome)]) -> Result<(), DomainError> {
        Ok(())
    }

    fn predict(&self, _features: &FeatureVector) -> Option<f64> {
        self.0
    }
}

pub struct Harness {
    pub bot: HuntBot,
    pub market: Arc<FakeMarket>,
    pub oracle: Arc<FakeOracle>,
    pub notifier: Arc<RecordingNotifier>,
    pub model_path: PathBuf,
    _dir: TempDir,
}

pub fn setup_with(
    config: BotConfig,
    oracle: FakeOracle,
    predictor: Option<Arc<dyn Predictor>>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let market = Arc::new(FakeMarket::default());
    let oracle = Arc::new(oracle);
    let notifier = Arc::new(RecordingNotifier::default());
    let predictor =
        predictor.unwrap_or_else(|| Arc::new(ForestPredictor::new(&model_path)) as Arc<dyn Predictor>);

    let bot = HuntBot::with_providers(
        ":memory:",
        config,
        market.clone(),
        oracle.clone(),
        notifier.clone(),
        predictor,
    )
    .unwrap();

    Harness {
        bot,
        market,
        oracle,
        notifier,
        model_path,
        _dir: dir,
    }
}

pub fn setup() -> Harness {
    setup_with(BotConfig::default(), FakeOracle::new(&[], &[]), None)
}
