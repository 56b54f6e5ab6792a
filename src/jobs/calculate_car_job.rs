use crate::errors::AppError;
use crate::risk;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn run(ctx: JobContext) -> Result<JobResult, AppError> {
    risk::calculate_car(&ctx.pool).await?;
    Ok(JobResult { items_processed: 1, items_failed: 0 })
}
