pub mod block_explorer;
pub mod price_oracle;
pub mod retry;

pub use block_explorer::{BlockExplorerClient, EtherscanClient};
pub use price_oracle::{DefiLlamaClient, PriceOracleClient};
