//! Core domain types for the KIS trading API client.
//!
//! This crate provides the vocabulary shared by the client and the CLI:
//! - `TradingEnv`: live vs. paper environment and the transaction-id rewrite rule
//! - `TrKey`: enumerated transaction-id lookup table
//! - `Price`, `Quantity`: precision-safe numeric types
//! - `OrderSide`, `OrderDivision`, `AmendKind`: order enums
//! - `SecretString`: zeroized, redacted credential material

pub mod decimal;
pub mod env;
pub mod error;
pub mod market;
pub mod order;
pub mod secret;
pub mod serde_str;
pub mod tr_id;

pub use decimal::{Price, Quantity};
pub use env::{rewrite_tr_id, TradingEnv, PAPER_REWRITE_PREFIXES};
pub use error::{CoreError, Result};
pub use market::{Market, OverseasExchange};
pub use order::{AmendKind, OrderDivision, OrderSide};
pub use secret::SecretString;
pub use tr_id::TrKey;
