pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::indicators::{self, TechnicalAnalysis, TrendCheck};
use crate::application::ledger::{LedgerUseCase, PerformanceReport};
use crate::application::orchestrator::{Orchestrator, ScanReport};
use crate::application::outcomes::{OutcomeTracker, TrainOutcome};
use crate::application::runner;
use crate::application::sentiment::SentimentFilter;
use crate::config::BotConfig;
use crate::domain::entities::closed_trade::ClosedTrade;
use crate::domain::entities::equity::EquitySnapshot;
use crate::domain::entities::feature_sample::FeatureSample;
use crate::domain::entities::position::Position;
use crate::domain::error::DomainError;
use crate::domain::ports::dataset_repository::DatasetRepository;
use crate::domain::ports::ledger_repository::LedgerRepository;
use crate::domain::ports::market_data::MarketData;
use crate::domain::ports::notifier::Notifier;
use crate::domain::ports::oracle::Oracle;
use crate::domain::ports::predictor::Predictor;
use crate::domain::values::bar::BarWindow;
use crate::domain::values::close_reason::CloseReason;
use crate::domain::values::mode::ConfirmationMode;
use crate::infrastructure::export::{self, ExportSummary};
use crate::infrastructure::market::yahoo::YahooMarketData;
use crate::infrastructure::ml::forest_predictor::ForestPredictor;
use crate::infrastructure::notify::log_notifier::LogNotifier;
use crate::infrastructure::notify::telegram::TelegramNotifier;
use crate::infrastructure::oracle::chat_completion::ChatCompletionOracle;
use crate::infrastructure::sqlite::dataset_repo::SqliteDatasetRepo;
use crate::infrastructure::sqlite::ledger_repo::SqliteLedgerRepo;
use crate::infrastructure::sqlite::migrations::run_migrations;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Indicator readout for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub ticker: String,
    pub analysis: TechnicalAnalysis,
    pub trend: Option<TrendCheck>,
}

pub struct HuntBot {
    config: BotConfig,
    ledger_repo: Arc<dyn LedgerRepository>,
    dataset: Arc<dyn DatasetRepository>,
    predictor: Arc<dyn Predictor>,
    market: Arc<dyn MarketData>,
    oracle: Arc<dyn Oracle>,
    notifier: Arc<dyn Notifier>,
}

fn open_connection(db_path: &str) -> Result<Connection, DomainError> {
    let conn = Connection::open(db_path).map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
    if db_path != ":memory:" {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
    }
    run_migrations(&conn)?;
    Ok(conn)
}

impl HuntBot {
    pub fn new(config: BotConfig) -> Result<Self, DomainError> {
        let api_key = config.oracle_api_key.clone().unwrap_or_else(|| {
            warn!("XAI_API_KEY is not set; oracle calls will fail");
            String::new()
        });
        let oracle: Arc<dyn Oracle> = Arc::new(ChatCompletionOracle::new(
            api_key,
            config.oracle_base_url.clone(),
            config.oracle_model.clone(),
        ));

        let notifier: Arc<dyn Notifier> = match (&config.telegram_token, config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Arc::new(TelegramNotifier::new(token.clone(), chat_id)),
            _ => {
                info!("Telegram not configured, notifications go to the log");
                Arc::new(LogNotifier)
            }
        };

        let predictor: Arc<dyn Predictor> = Arc::new(ForestPredictor::new(&config.model_path));
        let db_path = config.db_path.clone();
        Self::with_providers(
            &db_path,
            config,
            Arc::new(YahooMarketData::new()),
            oracle,
            notifier,
            predictor,
        )
    }

    pub fn with_providers(
        db_path: &str,
        config: BotConfig,
        market: Arc<dyn MarketData>,
        oracle: Arc<dyn Oracle>,
        notifier: Arc<dyn Notifier>,
        predictor: Arc<dyn Predictor>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let ledger_repo: Arc<dyn LedgerRepository> =
            Arc::new(SqliteLedgerRepo::new(open_connection(db_path)?));
        let dataset: Arc<dyn DatasetRepository> =
            Arc::new(SqliteDatasetRepo::new(open_connection(db_path)?));

        Ok(Self {
            config,
            ledger_repo,
            dataset,
            predictor,
            market,
            oracle,
            notifier,
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    fn ledger(&self) -> LedgerUseCase {
        LedgerUseCase::new(self.ledger_repo.clone())
    }

    fn outcomes(&self) -> OutcomeTracker {
        OutcomeTracker::new(self.dataset.clone(), self.predictor.clone())
    }

    /// A fresh orchestrator with empty session memory.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.config.engine(),
            self.ledger(),
            self.outcomes(),
            SentimentFilter::new(self.oracle.clone()),
            self.market.clone(),
            self.notifier.clone(),
        )
    }

    /// Single scan cycle outside the run loop. Proposals only live inside a
    /// running session, so confirm mode is refused here.
    pub async fn scan_once(&self) -> Result<ScanReport, DomainError> {
        if self.config.confirmation == ConfirmationMode::Confirm {
            return Err(DomainError::Config(
                "confirm mode needs `huntbot run`; a one-shot scan cannot receive the reply (use --mode auto)"
                    .into(),
            ));
        }
        self.orchestrator().scan_cycle().await
    }

    pub async fn run(&self) {
        let mut orchestrator = self.orchestrator();
        runner::run(&mut orchestrator, self.config.runner()).await;
    }

    // Delegating methods
    pub fn positions(&self) -> Result<Vec<Position>, DomainError> {
        self.ledger().positions()
    }

    pub fn history(&self) -> Result<Vec<ClosedTrade>, DomainError> {
        self.ledger().history()
    }

    pub fn report(&self) -> Result<PerformanceReport, DomainError> {
        self.ledger().report()
    }

    pub fn equity_curve(&self) -> Result<Vec<EquitySnapshot>, DomainError> {
        self.ledger().equity_curve()
    }

    pub fn samples(&self) -> Result<Vec<FeatureSample>, DomainError> {
        self.dataset.list_samples()
    }

    /// Manual entry. No features are recorded, so the trade never reaches the
    /// training set unless a sample exists for it.
    pub fn open(
        &self,
        ticker: &str,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Result<Position, DomainError> {
        self.ledger()
            .open(ticker, entry_price, stop_loss, take_profit, Utc::now())
    }

    /// Manual exit. Without a price the latest quote is used; without a
    /// reason it is inferred from the sign of the profit.
    pub async fn close(
        &self,
        ticker: &str,
        exit_price: Option<f64>,
        reason: Option<CloseReason>,
    ) -> Result<ClosedTrade, DomainError> {
        let exit_price = match exit_price {
            Some(p) => p,
            None => self.market.latest_price(ticker).await?,
        };
        let ledger = self.ledger();
        let position = ledger
            .get(ticker)?
            .ok_or_else(|| DomainError::NotFound(format!("No open position for {ticker}")))?;
        let reason = reason.unwrap_or(if exit_price > position.entry_price {
            CloseReason::TakeProfit
        } else {
            CloseReason::StopLoss
        });

        let (position, trade) = ledger.close(ticker, exit_price, reason)?;
        if let Err(e) = self
            .outcomes()
            .record_outcome(&position.ticker, Some(&position.id), reason.outcome())
        {
            warn!(ticker = %position.ticker, "Failed to record outcome: {e}");
        }
        Ok(trade)
    }

    pub async fn analyze(&self, ticker: &str) -> Result<AnalysisView, DomainError> {
        let ticker = ticker.trim().to_uppercase();
        let bars = self.market.bars(&ticker, BarWindow::Hourly).await?;
        let analysis = indicators::analyze(&bars)?;
        let trend = match self.market.bars(&ticker, BarWindow::Weekly).await {
            Ok(weekly) => indicators::trend_check(&weekly).ok(),
            Err(e) => {
                warn!(%ticker, "Weekly bars unavailable: {e}");
                None
            }
        };
        Ok(AnalysisView {
            ticker,
            analysis,
            trend,
        })
    }

    pub fn train(&self) -> Result<TrainOutcome, DomainError> {
        self.outcomes().train()
    }

    pub async fn record_equity(&self) -> Result<EquitySnapshot, DomainError> {
        self.orchestrator().record_equity().await
    }

    pub fn export(&self, dir: &Path) -> Result<ExportSummary, DomainError> {
        export::export_all(
            dir,
            &self.positions()?,
            &self.history()?,
            &self.samples()?,
            &self.equity_curve()?,
        )
    }
}
