use crate::errors::AppError;
use crate::planner;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn run(ctx: JobContext) -> Result<JobResult, AppError> {
    planner::update_snapshots(&ctx.pool, &ctx.catalog_dir).await?;
    Ok(JobResult { items_processed: 1, items_failed: 0 })
}
