//! Market segments and overseas exchange codes.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market segment an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Domestic,
    Overseas,
    FuturesOptions,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domestic => write!(f, "domestic"),
            Self::Overseas => write!(f, "overseas"),
            Self::FuturesOptions => write!(f, "futures_options"),
        }
    }
}

impl FromStr for Market {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "domestic" | "krx" => Ok(Self::Domestic),
            "overseas" | "us" => Ok(Self::Overseas),
            "futures" | "futures_options" | "fo" => Ok(Self::FuturesOptions),
            other => Err(CoreError::UnknownMarket(other.to_string())),
        }
    }
}

/// US exchanges reachable through the overseas endpoints.
///
/// Quotation endpoints use three-letter codes (`NAS`), trading endpoints
/// use four-letter codes (`NASD`). Both spellings parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverseasExchange {
    Nasdaq,
    Nyse,
    Amex,
}

impl OverseasExchange {
    /// Code used by quotation endpoints (`EXCD`).
    pub fn quote_code(&self) -> &'static str {
        match self {
            Self::Nasdaq => "NAS",
            Self::Nyse => "NYS",
            Self::Amex => "AMS",
        }
    }

    /// Code used by trading endpoints (`OVRS_EXCG_CD`).
    pub fn order_code(&self) -> &'static str {
        match self {
            Self::Nasdaq => "NASD",
            Self::Nyse => "NYSE",
            Self::Amex => "AMEX",
        }
    }

    /// Product type code used by the ticker-info endpoint (`PRDT_TYPE_CD`).
    pub fn product_type_code(&self) -> &'static str {
        match self {
            Self::Nasdaq => "512",
            Self::Nyse => "513",
            Self::Amex => "529",
        }
    }
}

impl fmt::Display for OverseasExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.quote_code())
    }
}

impl FromStr for OverseasExchange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NAS" | "NASD" => Ok(Self::Nasdaq),
            "NYS" | "NYSE" => Ok(Self::Nyse),
            "AMS" | "AMEX" => Ok(Self::Amex),
            other => Err(CoreError::UnknownExchange(other.to_string())),
        }
    }
}
