use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "huntbot", about = "Sentiment-gated equity signal bot")]
pub struct Cli {
    /// Confirmation mode for new positions (auto, confirm)
    #[arg(long, global = true)]
    pub mode: Option<String>,
    /// Maximum simultaneously open positions
    #[arg(long, global = true)]
    pub max_positions: Option<usize>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the monitor / command / scan loop until Ctrl-C
    Run,
    /// Run a single scan cycle (auto mode only; confirm mode needs `run`)
    Scan,
    /// Run a single monitoring pass over open positions
    Monitor,
    /// Show indicators for a ticker
    Analyze { ticker: String },
    /// List open positions
    Positions,
    /// List closed trades
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Only trades closed since this date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        since: Option<String>,
    },
    /// Performance report over closed trades
    Report {
        /// Print the rendered message instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Open a position manually
    Open {
        ticker: String,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    /// Close a position manually
    Close {
        ticker: String,
        /// Exit price (latest quote when omitted)
        #[arg(long)]
        price: Option<f64>,
        /// Close reason (take_profit, stop_loss); inferred when omitted
        #[arg(long)]
        reason: Option<String>,
    },
    /// Retrain the outcome predictor on labeled samples
    Train,
    /// Record an equity snapshot, or print the curve with --list
    Equity {
        #[arg(long)]
        list: bool,
    },
    /// Write portfolio, history, dataset and equity files for dashboards
    Export {
        #[arg(long, default_value = ".")]
        dir: String,
    },
}
