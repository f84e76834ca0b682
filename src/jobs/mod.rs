use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

use crate::metrics;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::refresh_token_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::reset_code_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::rate_limit_prune_job(Arc::clone(&self)));
        tokio::spawn(Self::account_stats_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Delete expired refresh tokens (runs every hour). Verification never
    /// depends on this sweep; it only keeps the table small.
    async fn refresh_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::cleanup_expired_refresh_tokens(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired refresh tokens", count);
                    }
                    metrics::record_background_job(
                        "refresh_token_cleanup",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                }
                Err(e) => {
                    error!("Failed to cleanup expired refresh tokens: {}", e);
                    metrics::record_background_job(
                        "refresh_token_cleanup",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                }
            }
        }
    }

    /// Delete expired reset codes (runs every 15 minutes, matching the code
    /// TTL so a dead code never outlives its window by much)
    async fn reset_code_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900));

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::cleanup_expired_reset_codes(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired reset codes", count);
                    }
                    metrics::record_background_job(
                        "reset_code_cleanup",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                }
                Err(e) => {
                    error!("Failed to cleanup expired reset codes: {}", e);
                    metrics::record_background_job(
                        "reset_code_cleanup",
                        "error",
                        start.elapsed().as_secs_f64(),
                    );
                }
            }
        }
    }

    /// Drop elapsed rate-limit windows (runs every 10 minutes)
    async fn rate_limit_prune_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(600));

        loop {
            interval.tick().await;

            let pruned = tasks::prune_rate_limit_windows(&scheduler.context);
            if pruned > 0 {
                info!("Pruned {} elapsed rate-limit windows", pruned);
            }
        }
    }

    /// Refresh account gauges (runs every 5 minutes)
    async fn account_stats_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::refresh_account_stats(&scheduler.context).await {
                error!("Failed to refresh account stats: {}", e);
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - health is good
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
