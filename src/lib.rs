// Core modules
pub mod api;
pub mod backtest;
pub mod config;
pub mod db;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod persistence;
pub mod risk;
pub mod scheduler;
pub mod strategy;
pub mod telemetry;

// Re-export commonly used types
pub use error::{ConfigError, ExchangeError};
pub use exchange::Exchange;
pub use models::*;
pub use strategy::{Algorithm, Strategy};

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
