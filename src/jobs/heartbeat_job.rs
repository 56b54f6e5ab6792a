use tracing::info;

use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};

/// Cheap liveness pulse, logged every tick (spec §4.8).
pub async fn run(_ctx: JobContext) -> Result<JobResult, AppError> {
    info!("heartbeat");
    Ok(JobResult { items_processed: 1, items_failed: 0 })
}
