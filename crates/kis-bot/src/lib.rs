//! KIS trading command-line application.
//!
//! Loads layered configuration, authenticates once and runs a single
//! account, quotation, order or streaming-payload command.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, Command};
pub use crate::config::{AppConfig, ClientConfig};
pub use error::{AppError, AppResult};
