pub mod loader;

pub use loader::{load_protocols, load_tokens};
