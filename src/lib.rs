pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::marketplace::Marketplace;
pub use config::FeeConfig;
pub use error::{MarketError, Result};
