pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ModelSettings, ScrapeSettings};
pub use error::DossierError;
pub use types::*;
