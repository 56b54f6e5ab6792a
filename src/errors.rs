use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    /// A transient-network error that survived the retry budget in
    /// `external::retry::with_retry` (spec §4.2/§7's "surrenders").
    #[error("Connection error: {0}")]
    Connection(String),
    /// Catalog data integrity violation, e.g. a token referencing an
    /// unknown protocol id.
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}
