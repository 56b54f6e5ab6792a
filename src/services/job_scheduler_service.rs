use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::{BlockExplorerClient, PriceOracleClient};
use crate::jobs;

/// Shared, immutable handles every job closes over (spec §5).
#[derive(Clone)]
pub struct JobContext {
    pub pool: Arc<PgPool>,
    pub explorer: Arc<dyn BlockExplorerClient>,
    pub oracle: Arc<dyn PriceOracleClient>,
    pub catalog_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

/// How a job's own overlapping tick is handled (spec §4.8): coalesced
/// (skip the tick if the previous run is still in flight) or bounded to
/// up to `n` concurrent instances.
#[derive(Clone)]
enum Concurrency {
    Coalesce(Arc<AtomicBool>),
    Bounded(Arc<Semaphore>),
}

impl Concurrency {
    fn coalesce() -> Self {
        Concurrency::Coalesce(Arc::new(AtomicBool::new(false)))
    }

    fn bounded(n: usize) -> Self {
        Concurrency::Bounded(Arc::new(Semaphore::new(n)))
    }
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
}

impl JobSchedulerService {
    pub async fn new(
        pool: Arc<PgPool>,
        explorer: Arc<dyn BlockExplorerClient>,
        oracle: Arc<dyn PriceOracleClient>,
        catalog_dir: PathBuf,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("failed to create scheduler: {e}")))?;

        let context = JobContext { pool, explorer, oracle, catalog_dir };

        Ok(Self { scheduler, context })
    }

    /// Start the five scheduled jobs (spec §4.8).
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("starting job scheduler");

        self.schedule_job(
            "0/60 * * * * *",
            "heartbeat",
            "Every 60s",
            Concurrency::coalesce(),
            jobs::heartbeat,
        )
        .await?;

        self.schedule_job(
            "0/1 * * * * *",
            "collect_prices",
            "Every 1s",
            Concurrency::coalesce(),
            jobs::collect_prices,
        )
        .await?;

        self.schedule_job(
            "0/1 * * * * *",
            "collect_transfers",
            "Every 1s, up to 8 concurrent",
            Concurrency::bounded(8),
            jobs::collect_transfers,
        )
        .await?;

        self.schedule_job(
            "0 0 0 * * *",
            "update_snapshots",
            "Daily at 00:00 UTC",
            Concurrency::coalesce(),
            jobs::update_snapshots,
        )
        .await?;

        self.schedule_job(
            "0 0 1 * * *",
            "calculate_car",
            "Daily at 01:00 UTC",
            Concurrency::coalesce(),
            jobs::calculate_car,
        )
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("failed to start scheduler: {e}")))?;

        info!("job scheduler started with 5 jobs");
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("stopping job scheduler");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("failed to stop scheduler: {e}")))?;
        Ok(())
    }

    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        job_name: &'static str,
        description: &str,
        concurrency: Concurrency,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let job_fn = Arc::new(job_fn);

        let job = Job::new_async(schedule, move |_uuid, _l| {
            let context = context.clone();
            let job_fn = job_fn.clone();
            let concurrency = concurrency.clone();
            Box::pin(async move {
                run_tick(job_name, context, concurrency, job_fn).await;
            })
        })
        .map_err(|e| AppError::Scheduler(format!("failed to create job {job_name}: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("failed to add job {job_name}: {e}")))?;

        info!("scheduled: {} - {} [cron: {}]", job_name, description, schedule);
        Ok(())
    }
}

async fn run_tick<F, Fut>(job_name: &str, context: JobContext, concurrency: Concurrency, job_fn: Arc<F>)
where
    F: Fn(JobContext) -> Fut,
    Fut: std::future::Future<Output = Result<JobResult, AppError>>,
{
    match concurrency {
        Concurrency::Coalesce(running) => {
            if running.swap(true, Ordering::SeqCst) {
                return;
            }
            execute(job_name, context, job_fn).await;
            running.store(false, Ordering::SeqCst);
        }
        Concurrency::Bounded(semaphore) => {
            let Ok(_permit) = semaphore.try_acquire_owned() else {
                return;
            };
            execute(job_name, context, job_fn).await;
        }
    }
}

async fn execute<F, Fut>(job_name: &str, context: JobContext, job_fn: Arc<F>)
where
    F: Fn(JobContext) -> Fut,
    Fut: std::future::Future<Output = Result<JobResult, AppError>>,
{
    let started_at = Utc::now();
    let result = job_fn(context).await;
    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(r) if job_name == "heartbeat" => {
            // Too frequent to log at info without drowning the rest.
            let _ = r;
        }
        Ok(r) => {
            info!(
                job = job_name,
                processed = r.items_processed,
                failed = r.items_failed,
                duration_ms,
                "job completed"
            );
        }
        Err(e) => {
            if job_name == "collect_transfers" || job_name == "collect_prices" {
                warn!(job = job_name, error = %e, duration_ms, "job failed");
            } else {
                error!(job = job_name, error = %e, duration_ms, "job failed");
            }
        }
    }
}
