pub mod assets_queries;
pub mod price_queries;
pub mod price_snapshot_queries;
pub mod protocol_queries;
pub mod token_queries;
pub mod transfer_queries;
pub mod transfer_snapshot_queries;
pub mod treasury_queries;
