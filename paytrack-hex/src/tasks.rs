//! Periodic maintenance owned by the server lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, interval_at};
use tracing::{error, info, instrument};

use paytrack_types::Repository;

use crate::inbound::AppState;
use crate::inbound::rate_limit::{RateLimitState, SWEEP_THRESHOLD};

/// Deletes expired session tokens every `period` until shutdown.
#[instrument(skip(state, shutdown))]
pub async fn run_token_sweeper<R: Repository>(
    state: Arc<AppState<R>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.auth.sweep_expired_tokens().await {
                    Ok(report) => info!(
                        refresh_tokens = report.refresh_tokens,
                        reset_tokens = report.reset_tokens,
                        "Expired tokens swept"
                    ),
                    Err(e) => error!("Token sweep failed: {}", e),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    info!("Token sweeper stopped");
}

/// Clears the rate limiter table whenever it outgrows [`SWEEP_THRESHOLD`].
#[instrument(skip(limiter, shutdown))]
pub async fn run_rate_limit_sweeper(
    limiter: Arc<RateLimitState>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep(SWEEP_THRESHOLD);
                if removed > 0 {
                    info!(removed, "Rate limiter table cleared");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    info!("Rate limit sweeper stopped");
}
