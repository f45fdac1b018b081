use std::{sync::Arc, time::Instant};
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::metrics;

pub mod tasks;

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

        // Consistency repair
        tokio::spawn(Self::ranking_reconcile_job(Arc::clone(&self)));
        tokio::spawn(Self::like_recount_job(Arc::clone(&self)));

        // Monitoring
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));
        tokio::spawn(Self::uptime_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Realign ranking scores with view counters
    async fn ranking_reconcile_job(scheduler: Arc<Self>) {
        let period = scheduler.context.config.ranking.reconcile_interval_secs.max(1);
        let mut interval = interval(Duration::from_secs(period));

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::reconcile_ranking(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Reconciled {} ranking scores", count);
                    }
                    metrics::record_background_job("ranking_reconcile", "success", start.elapsed().as_secs_f64());
                }
                Err(e) => {
                    error!("Failed to reconcile ranking: {}", e);
                    metrics::record_background_job("ranking_reconcile", "failure", start.elapsed().as_secs_f64());
                }
            }
        }
    }

    /// Repair drifted like counts (runs every hour)
    async fn like_recount_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::recount_likes(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Repaired like count on {} images", count);
                    }
                    metrics::record_background_job("like_recount", "success", start.elapsed().as_secs_f64());
                }
                Err(e) => {
                    error!("Failed to recount likes: {}", e);
                    metrics::record_background_job("like_recount", "failure", start.elapsed().as_secs_f64());
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    metrics::record_background_job("health_check", "success", start.elapsed().as_secs_f64());
                }
                Err(e) => {
                    error!("Health check failed: {}", e);
                    metrics::record_background_job("health_check", "failure", start.elapsed().as_secs_f64());
                }
            }
        }
    }

    /// Keep the uptime gauge current
    async fn uptime_job(_scheduler: Arc<Self>) {
        let started = Instant::now();
        let mut interval = interval(Duration::from_secs(15));

        loop {
            interval.tick().await;
            metrics::UPTIME_SECONDS.set(started.elapsed().as_secs_f64());
        }
    }
}
