pub mod hashing;
pub mod price_collector;
pub mod transfer_collector;

pub use price_collector::collect_prices;
pub use transfer_collector::collect_transfers;
