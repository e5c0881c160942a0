use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::application::orchestrator::Orchestrator;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    pub tick: Duration,
    pub scan_interval: Duration,
    /// Pause after a failed pass.
    pub cooldown: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(10),
            scan_interval: Duration::from_secs(1800),
            cooldown: Duration::from_secs(60),
        }
    }
}

/// One loop iteration: monitor exits, poll commands and, when due, scan
/// and log equity.
async fn pass(
    orchestrator: &mut Orchestrator,
    config: &RunnerConfig,
    last_scan: &mut Option<Instant>,
) -> Result<(), DomainError> {
    let monitor = orchestrator.monitor_pass().await?;
    if !monitor.closed.is_empty() {
        info!(closed = monitor.closed.len(), "Exits recorded");
    }
    orchestrator.handle_commands().await?;

    let due = last_scan.map_or(true, |at| at.elapsed() >= config.scan_interval);
    if due {
        // Stamped only on success so a failed scan is retried after the cooldown.
        let report = orchestrator.scan_cycle().await?;
        *last_scan = Some(Instant::now());
        info!(
            mode = %report.mode,
            evaluated = report.candidates.len(),
            opened = report.opened(),
            "Scan cycle complete"
        );
        if let Err(e) = orchestrator.record_equity().await {
            warn!("Equity snapshot failed: {e}");
        }
    }
    Ok(())
}

/// Run until Ctrl-C.
pub async fn run(orchestrator: &mut Orchestrator, config: RunnerConfig) {
    run_until(orchestrator, config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await;
}

/// Run until `shutdown` resolves. A failed pass is logged and followed by a
/// cooldown; it never ends the loop.
pub async fn run_until(
    orchestrator: &mut Orchestrator,
    config: RunnerConfig,
    shutdown: impl Future<Output = ()>,
) {
    info!(
        tick_secs = config.tick.as_secs(),
        scan_secs = config.scan_interval.as_secs(),
        max_positions = orchestrator.config().max_positions,
        confirmation = %orchestrator.config().confirmation,
        "Bot started"
    );
    tokio::pin!(shutdown);
    let mut last_scan: Option<Instant> = None;

    loop {
        let step = async {
            match pass(orchestrator, &config, &mut last_scan).await {
                Ok(()) => sleep(config.tick).await,
                Err(e) => {
                    error!("Pass failed, cooling down: {e}");
                    sleep(config.cooldown).await;
                }
            }
        };
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = step => {}
        }
    }
}
