//! Trading environment selection.
//!
//! The upstream serves live and paper trading from different hosts and
//! keys. Paper trading also uses a parallel transaction-id namespace:
//! ids starting with `T`, `J` or `C` are served under a leading `V`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Leading characters that are rewritten to `V` in the paper environment.
pub const PAPER_REWRITE_PREFIXES: [char; 3] = ['T', 'J', 'C'];

/// Environment a session is bound to. Chosen once, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingEnv {
    #[default]
    Live,
    Paper,
}

impl TradingEnv {
    pub fn from_paper_flag(is_paper_trading: bool) -> Self {
        if is_paper_trading {
            Self::Paper
        } else {
            Self::Live
        }
    }

    #[inline]
    pub fn is_paper(&self) -> bool {
        matches!(self, Self::Paper)
    }
}

impl fmt::Display for TradingEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Paper => write!(f, "paper"),
        }
    }
}

/// Route a transaction id to the given environment.
///
/// Live ids pass through untouched. Paper ids starting with one of
/// [`PAPER_REWRITE_PREFIXES`] get their first character replaced by `V`;
/// any other id is unchanged. The rewrite is idempotent.
pub fn rewrite_tr_id(tr_id: &str, env: TradingEnv) -> Cow<'_, str> {
    if !env.is_paper() {
        return Cow::Borrowed(tr_id);
    }
    let mut chars = tr_id.chars();
    match chars.next() {
        Some(first) if PAPER_REWRITE_PREFIXES.contains(&first) => {
            Cow::Owned(format!("V{}", chars.as_str()))
        }
        _ => Cow::Borrowed(tr_id),
    }
}
