//! Decision pipeline: screening, per-candidate evaluation, user commands and
//! exit monitoring.
//!
//! Session memory (tickers already signaled, proposals awaiting an answer)
//! lives on the [`Orchestrator`] instance, so two instances never share it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::indicators::{self, TechnicalAnalysis};
use crate::application::ledger::LedgerUseCase;
use crate::application::outcomes::OutcomeTracker;
use crate::application::sentiment::SentimentFilter;
use crate::domain::entities::closed_trade::ClosedTrade;
use crate::domain::entities::equity::EquitySnapshot;
use crate::domain::entities::pending::PendingConfirmation;
use crate::domain::error::DomainError;
use crate::domain::ports::market_data::MarketData;
use crate::domain::ports::notifier::Notifier;
use crate::domain::values::bar::BarWindow;
use crate::domain::values::close_reason::CloseReason;
use crate::domain::values::command::Command;
use crate::domain::values::features::FeatureVector;
use crate::domain::values::judgment::SentimentJudgment;
use crate::domain::values::mode::{ConfirmationMode, ScanMode};
use crate::domain::values::signal::TechSignal;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_positions: usize,
    pub confirmation: ConfirmationMode,
    /// Hunt-mode candidates with a predicted win probability below this are vetoed.
    pub veto_threshold: f64,
    pub pending_ttl: Duration,
    /// Authenticity fed to the feature vector when the check is bypassed.
    pub watch_authenticity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_positions: 5,
            confirmation: ConfirmationMode::Auto,
            veto_threshold: 0.30,
            pending_ttl: Duration::hours(24),
            watch_authenticity: 0.8,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    signaled: HashSet<String>,
    pending: HashMap<String, PendingConfirmation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Opened {
        entry: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    AwaitingConfirmation,
    Suggested,
    Vetoed {
        probability: f64,
    },
    NoSignal {
        signal: String,
    },
    Skipped {
        reason: String,
    },
    CapacityReached,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    pub ticker: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub mode: ScanMode,
    pub confirmation: ConfirmationMode,
    pub candidates: Vec<CandidateReport>,
}

impl ScanReport {
    pub fn opened(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| matches!(c.verdict, Verdict::Opened { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorReport {
    pub checked: usize,
    pub closed: Vec<ClosedTrade>,
    /// Tickers without a usable price this pass.
    pub unpriced: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandOutcome {
    Confirmed { ticker: String },
    Rejected { ticker: String },
    Refused { ticker: String, reason: String },
    Reported,
}

/// A candidate that passed every filter.
struct Qualified {
    judgment: SentimentJudgment,
    analysis: TechnicalAnalysis,
    features: FeatureVector,
    probability: Option<f64>,
}

enum Evaluation {
    Qualified(Box<Qualified>),
    Rejected(Verdict),
}

pub struct Orchestrator {
    config: EngineConfig,
    ledger: LedgerUseCase,
    outcomes: OutcomeTracker,
    filter: SentimentFilter,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    session: SessionState,
}

fn skipped(reason: impl Into<String>) -> Evaluation {
    Evaluation::Rejected(Verdict::Skipped {
        reason: reason.into(),
    })
}

fn format_probability(p: Option<f64>) -> String {
    p.map_or_else(|| "n/a".to_string(), |p| format!("{:.0}%", p * 100.0))
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        ledger: LedgerUseCase,
        outcomes: OutcomeTracker,
        filter: SentimentFilter,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            ledger,
            outcomes,
            filter,
            market,
            notifier,
            session: SessionState::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pending(&self) -> Vec<PendingConfirmation> {
        let mut pending: Vec<_> = self.session.pending.values().cloned().collect();
        pending.sort_by_key(|p| p.proposed_at);
        pending
    }

    pub fn is_signaled(&self, ticker: &str) -> bool {
        self.session.signaled.contains(&ticker.to_uppercase())
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.send(text).await {
            warn!(notifier = self.notifier.name(), "Notification failed: {e}");
        }
    }

    /// Drop proposals older than the TTL and make their tickers eligible again.
    pub fn purge_expired(&mut self) -> Vec<String> {
        let now = Utc::now();
        let ttl = self.config.pending_ttl;
        let expired: Vec<String> = self
            .session
            .pending
            .values()
            .filter(|p| p.is_expired(now, ttl))
            .map(|p| p.ticker.clone())
            .collect();
        for ticker in &expired {
            self.session.pending.remove(ticker);
            self.session.signaled.remove(ticker);
            info!(%ticker, "Pending proposal expired");
        }
        expired
    }

    pub async fn scan_cycle(&mut self) -> Result<ScanReport, DomainError> {
        self.purge_expired();

        let mode = if self.ledger.capacity(self.config.max_positions)? {
            ScanMode::Watch
        } else {
            ScanMode::Hunt
        };
        info!(%mode, confirmation = %self.config.confirmation, "Scan started");

        let tickers = self.filter.screen(mode).await?;
        let mut candidates = Vec::with_capacity(tickers.len());

        for ticker in tickers {
            if self.session.signaled.contains(&ticker) {
                debug!(%ticker, "Already signaled this session");
                continue;
            }
            if self.ledger.get(&ticker)?.is_some() {
                debug!(%ticker, "Already held");
                continue;
            }

            let q = match self.evaluate(&ticker, mode).await? {
                Evaluation::Qualified(q) => q,
                Evaluation::Rejected(verdict) => {
                    debug!(%ticker, ?verdict, "Candidate rejected");
                    candidates.push(CandidateReport { ticker, verdict });
                    continue;
                }
            };

            let verdict = match (mode, self.config.confirmation) {
                (ScanMode::Watch, _) => self.suggest(&ticker, &q).await,
                (ScanMode::Hunt, ConfirmationMode::Confirm) => {
                    self.request_confirmation(&ticker, &q).await
                }
                (ScanMode::Hunt, ConfirmationMode::Auto) => {
                    if self.ledger.capacity(self.config.max_positions)? {
                        info!(%ticker, "Ledger full, stopping scan");
                        candidates.push(CandidateReport {
                            ticker,
                            verdict: Verdict::CapacityReached,
                        });
                        break;
                    }
                    self.open_autonomous(&ticker, &q).await?
                }
            };
            candidates.push(CandidateReport { ticker, verdict });
        }

        let report = ScanReport {
            mode,
            confirmation: self.config.confirmation,
            candidates,
        };
        info!(%mode, evaluated = report.candidates.len(), opened = report.opened(), "Scan finished");
        Ok(report)
    }

    /// Sentiment, authenticity, indicators and the predictor gate. Oracle and
    /// market failures reject the candidate; persistence failures propagate.
    async fn evaluate(&self, ticker: &str, mode: ScanMode) -> Result<Evaluation, DomainError> {
        let judgment = match self.filter.sentiment(ticker).await {
            Ok(j) => j,
            Err(e) => {
                warn!(%ticker, "Sentiment unavailable: {e}");
                return Ok(skipped("sentiment unavailable"));
            }
        };
        if judgment.is_noise() {
            return Ok(skipped("not enough discussion"));
        }

        let auth_score = match mode {
            ScanMode::Watch => self.config.watch_authenticity,
            ScanMode::Hunt => match self.filter.authenticity(ticker, &judgment.topic).await {
                Ok(a) if a.is_organic() => a.score(),
                Ok(a) => {
                    debug!(%ticker, score = a.score(), crowd = %a.crowd, "Crowd looks artificial");
                    return Ok(skipped(format!("authenticity {:.2}", a.score())));
                }
                Err(e) => {
                    warn!(%ticker, "Authenticity unavailable: {e}");
                    return Ok(skipped("authenticity unavailable"));
                }
            },
        };

        let analysis = match self.market.bars(ticker, BarWindow::Hourly).await {
            Ok(bars) => match indicators::analyze(&bars) {
                Ok(a) => a,
                Err(e) => return Ok(skipped(e.to_string())),
            },
            Err(e) => {
                warn!(%ticker, "Bars unavailable: {e}");
                return Ok(skipped("price data unavailable"));
            }
        };

        if !analysis.signal.is_buy() {
            return Ok(Evaluation::Rejected(Verdict::NoSignal {
                signal: analysis.signal.to_string(),
            }));
        }
        if !analysis.has_valid_exits() {
            warn!(
                %ticker,
                entry = analysis.entry,
                stop_loss = analysis.stop_loss,
                take_profit = analysis.take_profit,
                "Unusable exit levels"
            );
            return Ok(skipped("unusable exit levels"));
        }

        let features = FeatureVector {
            sentiment: judgment.sentiment,
            auth_score,
            rsi: analysis.rsi,
            score_tech: analysis.score,
            volatility: FeatureVector::volatility_ratio(analysis.entry, analysis.take_profit),
        };
        let probability = self.outcomes.predict(&features);
        if mode == ScanMode::Hunt {
            if let Some(p) = probability.filter(|p| *p < self.config.veto_threshold) {
                info!(%ticker, probability = p, "Vetoed by predictor");
                return Ok(Evaluation::Rejected(Verdict::Vetoed { probability: p }));
            }
        }

        Ok(Evaluation::Qualified(Box::new(Qualified {
            judgment,
            analysis,
            features,
            probability,
        })))
    }

    async fn suggest(&mut self, ticker: &str, q: &Qualified) -> Verdict {
        self.session.signaled.insert(ticker.to_string());
        let a = &q.analysis;
        let text = format!(
            "💡 <b>IDEA: {ticker}</b> ({:.2}$)\n\
             📈 Signal: {} (score {:.1})\n\
             🧠 {}\n\
             🤖 Win probability: {}\n\
             <i>Ledger full, informational only.</i>",
            a.entry,
            a.signal,
            a.score,
            q.judgment.topic,
            format_probability(q.probability)
        );
        self.notify(&text).await;
        Verdict::Suggested
    }

    async fn request_confirmation(&mut self, ticker: &str, q: &Qualified) -> Verdict {
        let a = &q.analysis;
        let trend = match self.market.bars(ticker, BarWindow::Weekly).await {
            Ok(bars) => indicators::trend_check(&bars)
                .map(|t| format!("{} ({})", t.verdict, t.details.join(", ")))
                .unwrap_or_else(|_| "n/a".to_string()),
            Err(_) => "n/a".to_string(),
        };

        self.session.signaled.insert(ticker.to_string());
        self.session.pending.insert(
            ticker.to_string(),
            PendingConfirmation {
                ticker: ticker.to_string(),
                entry_price: a.entry,
                stop_loss: a.stop_loss,
                take_profit: a.take_profit,
                features: q.features,
                proposed_at: Utc::now(),
            },
        );

        let icon = if a.signal == TechSignal::StrongBuy {
            "🚀"
        } else {
            "✅"
        };
        let text = format!(
            "{icon} <b>SIGNAL: {ticker}</b> ({:.2}$)\n\
             ----------------------------\n\
             📈 <b>H1 signal:</b> {} (score {:.1})\n\
             📅 <b>Weekly trend:</b> {trend}\n\
             🧠 <b>Topic:</b> {}\n\
             🤖 <b>Win probability:</b> {}\n\
             ----------------------------\n\
             🛡️ SL: {:.2}$ | 🎯 TP: {:.2}$\n\n\
             👉 Reply 'ACHAT {ticker}' or 'NON {ticker}'",
            a.entry,
            a.signal,
            a.score,
            q.judgment.topic,
            format_probability(q.probability),
            a.stop_loss,
            a.take_profit
        );
        self.notify(&text).await;
        info!(%ticker, "Confirmation requested");
        Verdict::AwaitingConfirmation
    }

    async fn open_autonomous(&mut self, ticker: &str, q: &Qualified) -> Result<Verdict, DomainError> {
        let a = &q.analysis;
        let position = match self
            .ledger
            .open(ticker, a.entry, a.stop_loss, a.take_profit, Utc::now())
        {
            Ok(p) => p,
            Err(DomainError::DuplicateTicker(_)) => {
                return Ok(Verdict::Skipped {
                    reason: "already held".into(),
                })
            }
            Err(DomainError::InvalidInput(msg)) => return Ok(Verdict::Skipped { reason: msg }),
            Err(e) => return Err(e),
        };
        self.session.signaled.insert(position.ticker.clone());
        if let Err(e) = self
            .outcomes
            .record_features(&position.ticker, Some(&position.id), &q.features)
        {
            warn!(ticker = %position.ticker, "Failed to record features: {e}");
        }

        self.notify(&format!(
            "🤖 <b>BOUGHT: {}</b> at {:.2}$\n\
             🛡️ SL: {:.2}$ | 🎯 TP: {:.2}$\n\
             📈 {} (score {:.1}) | 🤖 {}",
            position.ticker,
            position.entry_price,
            position.stop_loss,
            position.take_profit,
            a.signal,
            a.score,
            format_probability(q.probability)
        ))
        .await;

        Ok(Verdict::Opened {
            entry: position.entry_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
        })
    }

    /// Drain inbound commands and act on them. Unrecognized text is ignored.
    pub async fn handle_commands(&mut self) -> Result<Vec<CommandOutcome>, DomainError> {
        self.purge_expired();
        let messages = match self.notifier.receive().await {
            Ok(m) => m,
            Err(e) => {
                warn!(notifier = self.notifier.name(), "Command polling failed: {e}");
                return Ok(Vec::new());
            }
        };

        let mut outcomes = Vec::new();
        for message in messages {
            let Some(command) = Command::parse(&message) else {
                debug!(%message, "Ignoring unrecognized message");
                continue;
            };
            match command {
                Command::Report => {
                    match self.ledger.report() {
                        Ok(report) => self.notify(&report.render()).await,
                        Err(e) => {
                            warn!("Report failed: {e}");
                            self.notify("⚠️ Report unavailable.").await;
                        }
                    }
                    outcomes.push(CommandOutcome::Reported);
                }
                Command::Confirm(ticker) => {
                    if let Some(outcome) = self.confirm(&ticker).await? {
                        outcomes.push(outcome);
                    }
                }
                Command::Reject(ticker) => {
                    if self.session.pending.remove(&ticker).is_some() {
                        self.session.signaled.remove(&ticker);
                        self.notify(&format!("🗑️ <b>{ticker}</b> ignored.")).await;
                        info!(%ticker, "Proposal rejected");
                        outcomes.push(CommandOutcome::Rejected { ticker });
                    } else {
                        debug!(%ticker, "Reject for unknown proposal");
                    }
                }
            }
        }
        Ok(outcomes)
    }

    async fn confirm(&mut self, ticker: &str) -> Result<Option<CommandOutcome>, DomainError> {
        let Some(pending) = self.session.pending.remove(ticker) else {
            debug!(%ticker, "Confirm for unknown proposal");
            return Ok(None);
        };

        let refuse = |reason: &str| CommandOutcome::Refused {
            ticker: ticker.to_string(),
            reason: reason.to_string(),
        };

        if self.ledger.capacity(self.config.max_positions)? {
            self.notify(&format!("⛔ Ledger full, <b>{ticker}</b> not bought."))
                .await;
            return Ok(Some(refuse("ledger full")));
        }

        let position = match self.ledger.open(
            &pending.ticker,
            pending.entry_price,
            pending.stop_loss,
            pending.take_profit,
            Utc::now(),
        ) {
            Ok(p) => p,
            Err(DomainError::DuplicateTicker(_)) => {
                self.notify(&format!("ℹ️ <b>{ticker}</b> is already held."))
                    .await;
                return Ok(Some(refuse("already held")));
            }
            Err(DomainError::InvalidInput(msg)) => {
                warn!(%ticker, "Proposal rejected by the ledger: {msg}");
                self.notify(&format!(
                    "⚠️ <b>{ticker}</b> not bought: the proposed levels are invalid."
                ))
                .await;
                return Ok(Some(refuse("invalid levels")));
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self
            .outcomes
            .record_features(&position.ticker, Some(&position.id), &pending.features)
        {
            warn!(%ticker, "Failed to record features: {e}");
        }
        self.notify(&format!(
            "✅ <b>{ticker}</b> added to the portfolio. Watching for the exit."
        ))
        .await;
        Ok(Some(CommandOutcome::Confirmed {
            ticker: ticker.to_string(),
        }))
    }

    /// Check every open position against its exits. Works on a snapshot
    /// taken at the start, so closing never disturbs the iteration.
    pub async fn monitor_pass(&mut self) -> Result<MonitorReport, DomainError> {
        let snapshot = self.ledger.positions()?;
        let mut report = MonitorReport {
            checked: snapshot.len(),
            ..Default::default()
        };

        for position in snapshot {
            let price = match self.market.latest_price(&position.ticker).await {
                Ok(p) => p,
                Err(e) => {
                    debug!(ticker = %position.ticker, "No price: {e}");
                    report.unpriced.push(position.ticker.clone());
                    continue;
                }
            };
            let Some(reason) = position.exit_trigger(price) else {
                continue;
            };

            let trade = match self.ledger.close(&position.ticker, price, reason) {
                Ok((_, trade)) => trade,
                Err(e) => {
                    warn!(ticker = %position.ticker, "Failed to record exit: {e}");
                    self.notify(&format!(
                        "⚠️ Failed to record the exit of <b>{}</b>: {e}",
                        position.ticker
                    ))
                    .await;
                    continue;
                }
            };

            if let Err(e) =
                self.outcomes
                    .record_outcome(&position.ticker, Some(&position.id), reason.outcome())
            {
                warn!(ticker = %position.ticker, "Failed to record outcome: {e}");
                self.notify(&format!(
                    "⚠️ Exit of <b>{}</b> saved but its outcome was not recorded: {e}",
                    position.ticker
                ))
                .await;
            }

            let text = match reason {
                CloseReason::TakeProfit => format!(
                    "💰 <b>TAKE PROFIT: {}</b>\n💵 Sold at {:.2}$\n📈 Gain: {:+.2}%",
                    trade.ticker, trade.exit_price, trade.profit_percent
                ),
                CloseReason::StopLoss => format!(
                    "🛡️ <b>STOP LOSS: {}</b>\n🩸 Exit at {:.2}$\n📉 Loss: {:.2}%",
                    trade.ticker, trade.exit_price, trade.profit_percent
                ),
            };
            self.notify(&text).await;
            report.closed.push(trade);
        }
        Ok(report)
    }

    /// Price every open position and append an equity point.
    pub async fn record_equity(&self) -> Result<EquitySnapshot, DomainError> {
        let mut prices = HashMap::new();
        for position in self.ledger.positions()? {
            match self.market.latest_price(&position.ticker).await {
                Ok(p) => {
                    prices.insert(position.ticker, p);
                }
                Err(e) => debug!(ticker = %position.ticker, "No price for equity: {e}"),
            }
        }
        self.ledger.record_equity(&prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::oracle::Oracle;
    use crate::domain::ports::predictor::Predictor;
    use crate::domain::values::bar::Bar;
    use crate::domain::values::close_reason::Outcome;
    use crate::infrastructure::sqlite::dataset_repo::SqliteDatasetRepo;
    use crate::infrastructure::sqlite::ledger_repo::SqliteLedgerRepo;
    use crate::infrastructure::sqlite::migrations::run_migrations;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct SilentOracle;

    #[async_trait]
    impl Oracle for SilentOracle {
        fn name(&self) -> &str {
            "silent"
        }

        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, DomainError> {
            Err(DomainError::DataUnavailable("offline".into()))
        }
    }

    struct NoMarket;

    #[async_trait]
    impl MarketData for NoMarket {
        fn name(&self) -> &str {
            "none"
        }

        async fn bars(&self, _ticker: &str, _window: BarWindow) -> Result<Vec<Bar>, DomainError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Inbox {
        inbound: Mutex<Vec<String>>,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Inbox {
        fn name(&self) -> &str {
            "inbox"
        }

        async fn send(&self, text: &str) -> Result<(), DomainError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn receive(&self) -> Result<Vec<String>, DomainError> {
            Ok(std::mem::take(&mut *self.inbound.lock().unwrap()))
        }
    }

    struct NoModel;

    impl Predictor for NoModel {
        fn name(&self) -> &str {
            "none"
        }

        fn fit(&self, _samples: &[(FeatureVector, Outcome)]) -> Result<(), DomainError> {
            Ok(())
        }

        fn predict(&self, _features: &FeatureVector) -> Option<f64> {
            None
        }
    }

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn orchestrator(notifier: Arc<Inbox>) -> Orchestrator {
        let ledger = LedgerUseCase::new(Arc::new(SqliteLedgerRepo::new(connection())));
        let outcomes =
            OutcomeTracker::new(Arc::new(SqliteDatasetRepo::new(connection())), Arc::new(NoModel));
        Orchestrator::new(
            EngineConfig {
                confirmation: ConfirmationMode::Confirm,
                ..EngineConfig::default()
            },
            ledger,
            outcomes,
            SentimentFilter::new(Arc::new(SilentOracle)),
            Arc::new(NoMarket),
            notifier,
        )
    }

    #[tokio::test]
    async fn test_invalid_proposal_is_refused_and_batch_continues() {
        let inbox = Arc::new(Inbox::default());
        let mut orch = orchestrator(inbox.clone());
        orch.session.signaled.insert("HALT".into());
        orch.session.pending.insert(
            "HALT".into(),
            PendingConfirmation {
                ticker: "HALT".into(),
                entry_price: 131.5,
                stop_loss: 131.5,
                take_profit: 131.5,
                features: FeatureVector {
                    sentiment: 0.6,
                    auth_score: 0.7,
                    rsi: 57.0,
                    score_tech: 2.0,
                    volatility: 0.0,
                },
                proposed_at: Utc::now(),
            },
        );
        inbox
            .inbound
            .lock()
            .unwrap()
            .extend(["ACHAT HALT".to_string(), "STATS".to_string()]);

        let outcomes = orch.handle_commands().await.unwrap();
        assert_eq!(
            outcomes,
            vec![
                CommandOutcome::Refused {
                    ticker: "HALT".into(),
                    reason: "invalid levels".into()
                },
                CommandOutcome::Reported
            ]
        );
        assert!(orch.pending().is_empty());
        assert!(orch.ledger.positions().unwrap().is_empty());

        let sent = inbox.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("not bought"));
        assert!(sent[1].contains("No closed trades"));
    }
}
