use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::service::GameService;
use crate::session::{ControllerConfig, SessionController, SessionStatus};

pub struct AutoConfig {
    pub controller: ControllerConfig,
    pub bet: f64,
    /// Cash out as soon as a polled multiplier reaches this.
    pub cash_out_at: f64,
    pub rounds: u32,
}

/// How one autoplayed round ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub round: u32,
    pub status: SessionStatus,
    pub multiplier: f64,
    pub message: String,
}

/// Play `rounds` sessions without a terminal, printing one line per round.
pub async fn auto<S: GameService, W: Write>(
    service: S,
    config: AutoConfig,
    mut out: W,
) -> Result<Vec<RoundSummary>> {
    if !(config.cash_out_at.is_finite() && config.cash_out_at >= 1.0) {
        bail!(
            "--cash-out-at must be a multiplier of at least 1.0, got {}",
            config.cash_out_at
        );
    }

    let mut controller = SessionController::new(service, config.controller);
    let mut summaries = Vec::new();
    for round in 1..=config.rounds {
        let mut poll = controller
            .start_session(config.bet)
            .await
            .with_context(|| format!("round {round}: failed to start session"))?;

        while let Some(tick) = poll.next_tick().await {
            let status = match controller.poll_tick(tick).await {
                Ok(status) => status,
                Err(e) => {
                    debug!(round, error = %e, "tick failed; still polling");
                    continue;
                }
            };
            if status == SessionStatus::Running
                && controller.state().multiplier >= config.cash_out_at
                && controller.cash_out().await.is_ok()
            {
                break;
            }
        }

        let state = controller.state();
        let summary = RoundSummary {
            round,
            status: state.status,
            multiplier: state.multiplier,
            message: state.message.clone(),
        };
        info!(round, status = %summary.status, multiplier = summary.multiplier, "round finished");
        writeln!(
            out,
            "round {}: {} at {:.2}x: {}",
            summary.round, summary.status, summary.multiplier, summary.message
        )?;
        summaries.push(summary);
    }
    out.flush()?;
    controller.shutdown();
    Ok(summaries)
}
