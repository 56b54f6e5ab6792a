pub mod assets;
pub mod category;
pub mod price;
pub mod protocol;
pub mod snapshot;
pub mod token;
pub mod transfer;

pub use assets::Assets;
pub use category::Category;
pub use price::{Price, RawPricePoint};
pub use protocol::{HackEvent, Protocol, Treasury};
pub use snapshot::{PriceSnapshot, TransferSnapshot};
pub use token::Token;
pub use transfer::{RawTransfer, Transfer};
