use clap::Parser;
use huntbot::cli::commands::{Cli, Commands};
use huntbot::config::BotConfig;
use huntbot::domain::values::close_reason::CloseReason;
use huntbot::HuntBot;
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn setup_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .compact()
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    setup_logger();
    let cli = Cli::parse();

    let mut config = match BotConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    if let Some(mode) = &cli.mode {
        match mode.parse() {
            Ok(m) => config.confirmation = m,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        }
    }
    if let Some(max) = cli.max_positions {
        config.max_positions = max;
    }

    let bot = match HuntBot::new(config) {
        Ok(bot) => bot,
        Err(e) => {
            error!("Error initializing huntbot: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(bot, cli.command).await {
        error!("{e}");
        std::process::exit(1);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_command(bot: HuntBot, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Run => bot.run().await,
        Commands::Scan => {
            let report = bot.scan_once().await?;
            print_json(&report)?;
        }
        Commands::Monitor => {
            let report = bot.orchestrator().monitor_pass().await?;
            print_json(&report)?;
        }
        Commands::Analyze { ticker } => {
            let view = bot.analyze(&ticker).await?;
            print_json(&view)?;
        }
        Commands::Positions => print_json(&bot.positions()?)?,
        Commands::History { limit, since } => {
            let since = parse_date(&since)?;
            let trades: Vec<_> = bot
                .history()?
                .into_iter()
                .rev()
                .filter(|t| since.map_or(true, |s| t.date_exit >= s))
                .take(limit)
                .collect();
            print_json(&trades)?;
        }
        Commands::Report { text } => {
            let report = bot.report()?;
            if text {
                println!("{}", report.render());
            } else {
                print_json(&report)?;
            }
        }
        Commands::Open {
            ticker,
            entry_price,
            stop_loss,
            take_profit,
        } => {
            let position = bot.open(&ticker, entry_price, stop_loss, take_profit)?;
            print_json(&position)?;
        }
        Commands::Close {
            ticker,
            price,
            reason,
        } => {
            let reason = reason.map(|r| r.parse::<CloseReason>()).transpose()?;
            let trade = bot.close(&ticker, price, reason).await?;
            print_json(&trade)?;
        }
        Commands::Train => print_json(&bot.train()?)?,
        Commands::Equity { list } => {
            if list {
                print_json(&bot.equity_curve()?)?;
            } else {
                print_json(&bot.record_equity().await?)?;
            }
        }
        Commands::Export { dir } => print_json(&bot.export(Path::new(&dir))?)?,
    }
    Ok(())
}

fn parse_date(s: &Option<String>) -> Result<Option<chrono::DateTime<chrono::Utc>>, String> {
    match s {
        None => Ok(None),
        Some(s) => {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&chrono::Utc)));
            }
            if let Some(dt) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
            {
                return Ok(Some(dt.and_utc()));
            }
            Err(format!("Invalid date format: {s}. Use YYYY-MM-DD or RFC3339"))
        }
    }
}
