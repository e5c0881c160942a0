//! Flat-file snapshots of the ledger, dataset and equity curve for external
//! dashboards.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::entities::closed_trade::ClosedTrade;
use crate::domain::entities::equity::EquitySnapshot;
use crate::domain::entities::feature_sample::FeatureSample;
use crate::domain::entities::position::Position;
use crate::domain::error::DomainError;

pub const PORTFOLIO_FILE: &str = "portfolio.json";
pub const HISTORY_FILE: &str = "trades_history.json";
pub const DATASET_FILE: &str = "ml_dataset.csv";
pub const EQUITY_FILE: &str = "equity_log.csv";

#[derive(Serialize)]
struct PortfolioEntry {
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    date_entry: String,
}

#[derive(Serialize)]
struct DatasetRow<'a> {
    sentiment: f64,
    auth_score: f64,
    rsi: f64,
    score_tech: f64,
    volatility: f64,
    ticker: &'a str,
    date: String,
    resultat: Option<u8>,
}

#[derive(Serialize)]
struct EquityRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Total_PNL")]
    total: f64,
    #[serde(rename = "Realise")]
    realized: f64,
    #[serde(rename = "Latent")]
    unrealized: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub positions: usize,
    pub trades: usize,
    pub samples: usize,
    pub equity_points: usize,
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> DomainError + '_ {
    move |e| DomainError::Io(format!("{}: {e}", path.display()))
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> DomainError + '_ {
    move |e| DomainError::Io(format!("{}: {e}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DomainError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| DomainError::Parse(e.to_string()))?;
    fs::write(path, json).map_err(io_err(path))
}

pub fn export_all(
    dir: &Path,
    positions: &[Position],
    trades: &[ClosedTrade],
    samples: &[FeatureSample],
    equity: &[EquitySnapshot],
) -> Result<ExportSummary, DomainError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;

    let portfolio: BTreeMap<&str, PortfolioEntry> = positions
        .iter()
        .map(|p| {
            (
                p.ticker.as_str(),
                PortfolioEntry {
                    entry_price: p.entry_price,
                    stop_loss: p.stop_loss,
                    take_profit: p.take_profit,
                    date_entry: p.date_entry.format("%Y-%m-%d %H:%M:%S").to_string(),
                },
            )
        })
        .collect();
    let portfolio_path = dir.join(PORTFOLIO_FILE);
    write_json(&portfolio_path, &portfolio)?;

    let history_path = dir.join(HISTORY_FILE);
    write_json(&history_path, &trades)?;

    let dataset_path = dir.join(DATASET_FILE);
    let mut writer = csv::Writer::from_path(&dataset_path).map_err(csv_err(&dataset_path))?;
    for s in samples {
        writer
            .serialize(DatasetRow {
                sentiment: s.features.sentiment,
                auth_score: s.features.auth_score,
                rsi: s.features.rsi,
                score_tech: s.features.score_tech,
                volatility: s.features.volatility,
                ticker: &s.ticker,
                date: s.recorded_at.format("%Y-%m-%d").to_string(),
                resultat: s.resultat.map(|o| o.label()),
            })
            .map_err(csv_err(&dataset_path))?;
    }
    writer.flush().map_err(io_err(&dataset_path))?;

    let equity_path = dir.join(EQUITY_FILE);
    let mut writer = csv::Writer::from_path(&equity_path).map_err(csv_err(&equity_path))?;
    for point in equity {
        writer
            .serialize(EquityRow {
                date: point.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                total: point.total,
                realized: point.realized,
                unrealized: point.unrealized,
            })
            .map_err(csv_err(&equity_path))?;
    }
    writer.flush().map_err(io_err(&equity_path))?;

    Ok(ExportSummary {
        files: vec![portfolio_path, history_path, dataset_path, equity_path],
        positions: positions.len(),
        trades: trades.len(),
        samples: samples.len(),
        equity_points: equity.len(),
    })
}
