mod common;

use common::*;
use huntbot::application::orchestrator::{CommandOutcome, ScanReport, Verdict};
use huntbot::config::BotConfig;
use huntbot::domain::error::DomainError;
use huntbot::domain::ports::predictor::Predictor;
use huntbot::domain::values::close_reason::{CloseReason, Outcome};
use huntbot::domain::values::mode::{ConfirmationMode, ScanMode};
use std::sync::Arc;

fn confirm_config() -> BotConfig {
    BotConfig {
        confirmation: ConfirmationMode::Confirm,
        ..BotConfig::default()
    }
}

fn verdicts(report: &ScanReport) -> Vec<(String, Verdict)> {
    report
        .candidates
        .iter()
        .map(|c| (c.ticker.clone(), c.verdict.clone()))
        .collect()
}

#[tokio::test]
async fn test_auto_mode_opens_and_records_features() {
    let h = setup_with(
        BotConfig::default(),
        FakeOracle::new(&["AAPL", "MSFT"], &[]),
        None,
    );
    let mut orch = h.bot.orchestrator();

    let report = orch.scan_cycle().await.unwrap();
    assert_eq!(report.mode, ScanMode::Hunt);
    assert_eq!(report.opened(), 2);

    let positions = h.bot.positions().unwrap();
    assert_eq!(positions.len(), 2);
    for p in &positions {
        assert!(p.stop_loss < p.entry_price && p.entry_price < p.take_profit);
    }

    let samples = h.bot.samples().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].position_id.as_deref(), Some(positions[0].id.as_str()));
    assert!(samples.iter().all(|s| s.resultat.is_none()));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("BOUGHT: AAPL"));
}

#[tokio::test]
async fn test_watch_mode_only_suggests() {
    let config = BotConfig {
        max_positions: 5,
        ..BotConfig::default()
    };
    let h = setup_with(config, FakeOracle::new(&["AAPL"], &["KO", "PFE", "CAT"]), None);
    for t in ["P1", "P2", "P3", "P4", "P5"] {
        h.bot.open(t, 100.0, 90.0, 120.0).unwrap();
    }
    let mut orch = h.bot.orchestrator();

    let report = orch.scan_cycle().await.unwrap();
    assert_eq!(report.mode, ScanMode::Watch);
    assert_eq!(report.opened(), 0);
    assert!(report.candidates.iter().all(|c| c.verdict == Verdict::Suggested));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.contains("IDEA")));
    assert_eq!(h.bot.positions().unwrap().len(), 5);
    assert_eq!(h.oracle.count("AUTHENTICITY CHECK"), 0);
    assert_eq!(h.oracle.count("MARKET SCREENER."), 0);
}

#[tokio::test]
async fn test_watch_mode_ignores_predictor_veto() {
    let config = BotConfig {
        max_positions: 1,
        ..BotConfig::default()
    };
    let predictor: Arc<dyn Predictor> = Arc::new(FixedPredictor(Some(0.1)));
    let h = setup_with(config, FakeOracle::new(&[], &["KO"]), Some(predictor));
    h.bot.open("P1", 100.0, 90.0, 120.0).unwrap();

    let report = h.bot.orchestrator().scan_cycle().await.unwrap();
    assert_eq!(verdicts(&report), vec![("KO".to_string(), Verdict::Suggested)]);
    assert!(h.notifier.sent()[0].contains("10%"));
}

#[tokio::test]
async fn test_capacity_stops_autonomous_opens() {
    let config = BotConfig {
        max_positions: 2,
        ..BotConfig::default()
    };
    let h = setup_with(config, FakeOracle::new(&["AAPL", "MSFT", "NVDA"], &[]), None);
    let mut orch = h.bot.orchestrator();

    let report = orch.scan_cycle().await.unwrap();
    assert_eq!(report.opened(), 2);
    assert_eq!(
        report.candidates.last().map(|c| (&c.ticker, &c.verdict)),
        Some((&"NVDA".to_string(), &Verdict::CapacityReached))
    );
    assert_eq!(h.bot.positions().unwrap().len(), 2);

    let next = orch.scan_cycle().await.unwrap();
    assert_eq!(next.mode, ScanMode::Watch);
    assert!(next.candidates.is_empty());
}

#[tokio::test]
async fn test_predictor_veto_in_hunt_mode() {
    let predictor: Arc<dyn Predictor> = Arc::new(FixedPredictor(Some(0.1)));
    let h = setup_with(BotConfig::default(), FakeOracle::new(&["AAPL"], &[]), Some(predictor));

    let report = h.bot.orchestrator().scan_cycle().await.unwrap();
    assert_eq!(
        verdicts(&report),
        vec![("AAPL".to_string(), Verdict::Vetoed { probability: 0.1 })]
    );
    assert!(h.bot.positions().unwrap().is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_no_model_does_not_block() {
    let predictor: Arc<dyn Predictor> = Arc::new(FixedPredictor(None));
    let h = setup_with(BotConfig::default(), FakeOracle::new(&["AAPL"], &[]), Some(predictor));

    let report = h.bot.orchestrator().scan_cycle().await.unwrap();
    assert_eq!(report.opened(), 1);
    assert!(h.notifier.sent()[0].contains("n/a"));
}

#[tokio::test]
async fn test_rejections_do_not_open() {
    let oracle = FakeOracle::new(&["BOT", "NOISE", "JUNK", "HOT"], &[]);
    oracle.set_authenticity("BOT", BOTS);
    oracle.set_sentiment(
        "NOISE",
        r#"{"spam_ratio": 0.0, "sentiment_score": 0.05, "volume_score": 0.2, "main_topic": "nothing"}"#,
    );
    oracle.set_sentiment("JUNK", "I cannot help with that.");
    let h = setup_with(BotConfig::default(), oracle, None);
    h.market.set_hourly("HOT", overbought_closes());

    let report = h.bot.orchestrator().scan_cycle().await.unwrap();
    let v = verdicts(&report);
    assert_eq!(v.len(), 4);
    assert!(matches!(&v[0].1, Verdict::Skipped { reason } if reason.starts_with("authenticity")));
    assert_eq!(
        v[1].1,
        Verdict::Skipped {
            reason: "not enough discussion".into()
        }
    );
    assert_eq!(
        v[2].1,
        Verdict::Skipped {
            reason: "sentiment unavailable".into()
        }
    );
    assert_eq!(
        v[3].1,
        Verdict::NoSignal {
            signal: "WAIT".into()
        }
    );
    assert!(h.bot.positions().unwrap().is_empty());
    assert!(h.bot.samples().unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_screener_fails_the_cycle() {
    let oracle = FakeOracle::new(&[], &[]);
    *oracle.hunt_reply.lock().unwrap() = "Top picks today: AAPL and MSFT".into();
    let h = setup_with(BotConfig::default(), oracle, None);

    assert!(h.bot.orchestrator().scan_cycle().await.is_err());
    assert!(h.bot.positions().unwrap().is_empty());
}

#[tokio::test]
async fn test_confirm_flow() {
    let h = setup_with(confirm_config(), FakeOracle::new(&["AAPL"], &[]), None);
    let mut orch = h.bot.orchestrator();

    let report = orch.scan_cycle().await.unwrap();
    assert_eq!(
        verdicts(&report),
        vec![("AAPL".to_string(), Verdict::AwaitingConfirmation)]
    );
    assert!(h.bot.positions().unwrap().is_empty());
    assert_eq!(orch.pending().len(), 1);
    assert!(h.notifier.sent()[0].contains("'ACHAT AAPL'"));

    h.notifier.clear();
    h.notifier.push_command("achat aapl");
    let outcomes = orch.handle_commands().await.unwrap();
    assert_eq!(
        outcomes,
        vec![CommandOutcome::Confirmed {
            ticker: "AAPL".into()
        }]
    );
    let positions = h.bot.positions().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].entry_price, *uptrend_closes().last().unwrap());
    assert!(orch.pending().is_empty());
    assert_eq!(h.bot.samples().unwrap().len(), 1);
    assert!(h.notifier.sent()[0].contains("added to the portfolio"));
}

#[tokio::test]
async fn test_signaled_ticker_not_reevaluated() {
    let h = setup_with(confirm_config(), FakeOracle::new(&["AAPL"], &[]), None);
    let mut orch = h.bot.orchestrator();

    orch.scan_cycle().await.unwrap();
    let again = orch.scan_cycle().await.unwrap();
    assert!(again.candidates.is_empty());
    assert_eq!(h.oracle.count("SENTIMENT ANALYSIS"), 1);
    assert!(orch.is_signaled("AAPL"));

    // A fresh session forgets what was signaled.
    let fresh = h.bot.orchestrator().scan_cycle().await.unwrap();
    assert_eq!(fresh.candidates.len(), 1);
}

#[tokio::test]
async fn test_reject_makes_ticker_eligible_again() {
    let h = setup_with(confirm_config(), FakeOracle::new(&["AAPL"], &[]), None);
    let mut orch = h.bot.orchestrator();
    orch.scan_cycle().await.unwrap();

    h.notifier.push_command("NON AAPL");
    let outcomes = orch.handle_commands().await.unwrap();
    assert_eq!(
        outcomes,
        vec![CommandOutcome::Rejected {
            ticker: "AAPL".into()
        }]
    );
    assert!(!orch.is_signaled("AAPL"));
    assert!(h.bot.positions().unwrap().is_empty());
    assert!(h.notifier.sent().last().unwrap().contains("ignored"));

    let report = orch.scan_cycle().await.unwrap();
    assert_eq!(
        verdicts(&report),
        vec![("AAPL".to_string(), Verdict::AwaitingConfirmation)]
    );
}

#[tokio::test]
async fn test_expired_proposal_is_purged() {
    let config = BotConfig {
        pending_ttl_hours: -1,
        ..confirm_config()
    };
    let h = setup_with(config, FakeOracle::new(&["AAPL"], &[]), None);
    let mut orch = h.bot.orchestrator();
    orch.scan_cycle().await.unwrap();
    assert_eq!(orch.pending().len(), 1);

    assert_eq!(orch.purge_expired(), vec!["AAPL".to_string()]);
    assert!(orch.pending().is_empty());
    assert!(!orch.is_signaled("AAPL"));

    h.notifier.push_command("ACHAT AAPL");
    assert!(orch.handle_commands().await.unwrap().is_empty());
    assert!(h.bot.positions().unwrap().is_empty());
}

#[tokio::test]
async fn test_confirm_refused_when_full() {
    let config = BotConfig {
        max_positions: 1,
        ..confirm_config()
    };
    let h = setup_with(config, FakeOracle::new(&["AAPL"], &[]), None);
    let mut orch = h.bot.orchestrator();
    orch.scan_cycle().await.unwrap();
    h.bot.open("MSFT", 100.0, 90.0, 120.0).unwrap();

    h.notifier.push_command("ACHAT AAPL");
    let outcomes = orch.handle_commands().await.unwrap();
    assert_eq!(
        outcomes,
        vec![CommandOutcome::Refused {
            ticker: "AAPL".into(),
            reason: "ledger full".into()
        }]
    );
    assert_eq!(h.bot.positions().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stats_and_unknown_commands() {
    let h = setup();
    let mut orch = h.bot.orchestrator();

    h.notifier.push_command("hello there");
    h.notifier.push_command("ACHAT ZZZ");
    assert!(orch.handle_commands().await.unwrap().is_empty());
    assert!(h.notifier.sent().is_empty());

    h.notifier.push_command("stats");
    assert_eq!(
        orch.handle_commands().await.unwrap(),
        vec![CommandOutcome::Reported]
    );
    assert!(h.notifier.sent()[0].contains("No closed trades"));
}

#[tokio::test]
async fn test_monitor_closes_and_labels() {
    let h = setup_with(
        BotConfig::default(),
        FakeOracle::new(&["AAPL", "MSFT", "NVDA"], &[]),
        None,
    );
    let mut orch = h.bot.orchestrator();
    assert_eq!(orch.scan_cycle().await.unwrap().opened(), 3);
    h.notifier.clear();

    h.market.set_price("AAPL", 200.0);
    h.market.set_price("MSFT", 50.0);
    let report = orch.monitor_pass().await.unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.unpriced, vec!["NVDA".to_string()]);
    assert_eq!(report.closed.len(), 2);
    assert_eq!(report.closed[0].reason, CloseReason::TakeProfit);
    assert_eq!(report.closed[1].reason, CloseReason::StopLoss);

    let positions = h.bot.positions().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].ticker, "NVDA");

    let samples = h.bot.samples().unwrap();
    let label = |t: &str| samples.iter().find(|s| s.ticker == t).unwrap().resultat;
    assert_eq!(label("AAPL"), Some(Outcome::Win));
    assert_eq!(label("MSFT"), Some(Outcome::Loss));
    assert_eq!(label("NVDA"), None);

    let sent = h.notifier.sent();
    assert!(sent[0].contains("TAKE PROFIT: AAPL"));
    assert!(sent[1].contains("STOP LOSS: MSFT"));

    // Nothing left to trigger.
    let again = orch.monitor_pass().await.unwrap();
    assert!(again.closed.is_empty());
    assert_eq!(h.bot.history().unwrap().len(), 2);
}

#[tokio::test]
async fn test_monitor_within_band_holds() {
    let h = setup();
    h.bot.open("KO", 60.0, 58.0, 63.0).unwrap();
    h.market.set_price("KO", 61.0);

    let report = h.bot.orchestrator().monitor_pass().await.unwrap();
    assert_eq!(report.checked, 1);
    assert!(report.closed.is_empty());
    assert!(report.unpriced.is_empty());
    assert_eq!(h.bot.positions().unwrap().len(), 1);
}

#[tokio::test]
async fn test_halted_ticker_gets_usable_exits() {
    let h = setup_with(confirm_config(), FakeOracle::new(&["HALT"], &[]), None);
    h.market.set_hourly_bars("HALT", halted_bars(20));
    let mut orch = h.bot.orchestrator();

    let report = orch.scan_cycle().await.unwrap();
    assert_eq!(
        verdicts(&report),
        vec![("HALT".to_string(), Verdict::AwaitingConfirmation)]
    );
    let proposal = &orch.pending()[0];
    assert!(proposal.stop_loss < proposal.entry_price);
    assert!(proposal.entry_price < proposal.take_profit);

    h.notifier.clear();
    h.notifier.push_command("ACHAT HALT");
    h.notifier.push_command("STATS");
    let outcomes = orch.handle_commands().await.unwrap();
    assert_eq!(
        outcomes,
        vec![
            CommandOutcome::Confirmed {
                ticker: "HALT".into()
            },
            CommandOutcome::Reported
        ]
    );
    assert_eq!(h.bot.positions().unwrap().len(), 1);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_one_shot_scan_refuses_confirm_mode() {
    let h = setup_with(confirm_config(), FakeOracle::new(&["AAPL"], &[]), None);
    let err = h.bot.scan_once().await.unwrap_err();
    assert!(matches!(err, DomainError::Config(_)));
    assert!(h.oracle.prompts.lock().unwrap().is_empty());
    assert!(h.notifier.sent().is_empty());

    let auto = setup_with(BotConfig::default(), FakeOracle::new(&["AAPL"], &[]), None);
    assert_eq!(auto.bot.scan_once().await.unwrap().opened(), 1);
}
