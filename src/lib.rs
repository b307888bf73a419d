pub mod analytics;
pub mod config;
pub mod error;
pub mod source;

pub use error::{Error, Result};
