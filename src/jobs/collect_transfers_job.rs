use crate::collectors;
use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn run(ctx: JobContext) -> Result<JobResult, AppError> {
    collectors::collect_transfers(&ctx.pool, ctx.explorer.as_ref()).await?;
    Ok(JobResult { items_processed: 1, items_failed: 0 })
}
