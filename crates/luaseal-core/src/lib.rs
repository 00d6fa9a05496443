pub mod config;
pub mod error;
pub mod keysource;

pub use error::{LuasealError, LuasealResult};
pub use keysource::{load_master_key, LoadedKey};
