//! Order-related enums and their wire codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn from_buy_flag(buy: bool) -> Self {
        if buy {
            Self::Buy
        } else {
            Self::Sell
        }
    }

    /// `SLL_BUY_DVSN_CD` used by futures/options orders.
    pub fn futures_code(&self) -> &'static str {
        match self {
            Self::Buy => "02",
            Self::Sell => "01",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order division (`ORD_DVSN`): how the order is priced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderDivision {
    /// "00" - limit.
    #[default]
    Limit,
    /// "01" - market.
    Market,
    /// Any other upstream code, passed through verbatim.
    Code(String),
}

impl OrderDivision {
    pub fn code(&self) -> &str {
        match self {
            Self::Limit => "00",
            Self::Market => "01",
            Self::Code(c) => c.as_str(),
        }
    }
}

impl From<&str> for OrderDivision {
    fn from(code: &str) -> Self {
        match code {
            "00" => Self::Limit,
            "01" => Self::Market,
            other => Self::Code(other.to_string()),
        }
    }
}

/// Revise/cancel discriminator (`RVSE_CNCL_DVSN_CD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmendKind {
    Revise,
    Cancel,
}

impl AmendKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Revise => "01",
            Self::Cancel => "02",
        }
    }
}

impl fmt::Display for AmendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revise => write!(f, "revise"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_codes() {
        assert_eq!(OrderDivision::Limit.code(), "00");
        assert_eq!(OrderDivision::Market.code(), "01");
        assert_eq!(OrderDivision::from("04").code(), "04");
        assert_eq!(OrderDivision::from("00"), OrderDivision::Limit);
    }

    #[test]
    fn test_amend_and_side_codes() {
        assert_eq!(AmendKind::Cancel.code(), "02");
        assert_eq!(AmendKind::Revise.code(), "01");
        assert_eq!(OrderSide::Buy.futures_code(), "02");
        assert_eq!(OrderSide::from_buy_flag(false), OrderSide::Sell);
    }
}
