//! Streaming subscription payloads.
//!
//! Builds the JSON text a websocket client sends to (un)subscribe a
//! real-time feed. Transport is out of scope; only the payload is built.
//!
//! Commands per segment:
//!
//! | cmd | domestic     | overseas     | futures/options |
//! |-----|--------------|--------------|-----------------|
//! | 0   | -            | -            | H0IOCNT0 off    |
//! | 1   | H0UNASP0 on  | HDFSASP0 on  | H0IOCNT0 on     |
//! | 2   | H0UNASP0 off | HDFSASP0 off | H0IOASP0 on     |
//! | 3   | H0UNCNT0 on  | HDFSCNT0 on  | H0IFCNT0 on     |
//! | 4   | H0UNCNT0 off | HDFSCNT0 off | H0IOASP0 off    |
//! | 5   | H0STCNI0 on  | H0GSCNI0 on  | H0IFCNI0 on     |
//! | 6   | H0STCNI0 off | H0GSCNI0 off | H0IFCNI0 off    |
//! | 7   | H0STCNI9 on  | -            | H0IFCNI9 on     |
//! | 8   | H0STCNI9 off | -            | H0IFCNI9 off    |
//!
//! Commands 5..=8 are fill notices keyed by the HTS id; the others are
//! keyed by instrument code.

use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use kis_core::{Market, TradingEnv};
use serde_json::json;

const SUBSCRIBE: &str = "1";
const UNSUBSCRIBE: &str = "2";

/// What `tr_key` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Instrument,
    HtsId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCommand {
    pub tr_id: &'static str,
    /// "1" subscribe, "2" unsubscribe.
    pub tr_type: &'static str,
    pub key: KeyKind,
}

/// Resolve a numeric command for a market segment.
pub fn resolve_command(market: Market, cmd: u8) -> ClientResult<StreamCommand> {
    let entry = match (market, cmd) {
        (Market::Domestic, 1) => ("H0UNASP0", SUBSCRIBE),
        (Market::Domestic, 2) => ("H0UNASP0", UNSUBSCRIBE),
        (Market::Domestic, 3) => ("H0UNCNT0", SUBSCRIBE),
        (Market::Domestic, 4) => ("H0UNCNT0", UNSUBSCRIBE),
        (Market::Domestic, 5) => ("H0STCNI0", SUBSCRIBE),
        (Market::Domestic, 6) => ("H0STCNI0", UNSUBSCRIBE),
        (Market::Domestic, 7) => ("H0STCNI9", SUBSCRIBE),
        (Market::Domestic, 8) => ("H0STCNI9", UNSUBSCRIBE),

        (Market::Overseas, 1) => ("HDFSASP0", SUBSCRIBE),
        (Market::Overseas, 2) => ("HDFSASP0", UNSUBSCRIBE),
        (Market::Overseas, 3) => ("HDFSCNT0", SUBSCRIBE),
        (Market::Overseas, 4) => ("HDFSCNT0", UNSUBSCRIBE),
        (Market::Overseas, 5) => ("H0GSCNI0", SUBSCRIBE),
        (Market::Overseas, 6) => ("H0GSCNI0", UNSUBSCRIBE),

        (Market::FuturesOptions, 0) => ("H0IOCNT0", UNSUBSCRIBE),
        (Market::FuturesOptions, 1) => ("H0IOCNT0", SUBSCRIBE),
        (Market::FuturesOptions, 2) => ("H0IOASP0", SUBSCRIBE),
        (Market::FuturesOptions, 3) => ("H0IFCNT0", SUBSCRIBE),
        (Market::FuturesOptions, 4) => ("H0IOASP0", UNSUBSCRIBE),
        (Market::FuturesOptions, 5) => ("H0IFCNI0", SUBSCRIBE),
        (Market::FuturesOptions, 6) => ("H0IFCNI0", UNSUBSCRIBE),
        (Market::FuturesOptions, 7) => ("H0IFCNI9", SUBSCRIBE),
        (Market::FuturesOptions, 8) => ("H0IFCNI9", UNSUBSCRIBE),

        _ => {
            return Err(ClientError::InvalidCommand(format!(
                "{market} has no command {cmd}"
            )))
        }
    };
    let key = if (5..=8).contains(&cmd) {
        KeyKind::HtsId
    } else {
        KeyKind::Instrument
    };
    Ok(StreamCommand {
        tr_id: entry.0,
        tr_type: entry.1,
        key,
    })
}

/// Command number for fill notices in the given environment.
pub fn fill_notice_command(market: Market, env: TradingEnv, subscribe: bool) -> ClientResult<u8> {
    let base = match (market, env) {
        (_, TradingEnv::Live) => 5,
        (Market::Overseas, TradingEnv::Paper) => {
            return Err(ClientError::InvalidCommand(
                "overseas fill notices have no paper feed".to_string(),
            ))
        }
        (_, TradingEnv::Paper) => 7,
    };
    Ok(if subscribe { base } else { base + 1 })
}

/// Serialize the subscription envelope.
pub fn subscription_payload(
    approval_key: &str,
    custtype: &str,
    command: &StreamCommand,
    tr_key: &str,
) -> String {
    json!({
        "header": {
            "approval_key": approval_key,
            "custtype": custtype,
            "tr_type": command.tr_type,
            "content-type": "utf-8",
        },
        "body": {
            "input": {
                "tr_id": command.tr_id,
                "tr_key": tr_key,
            }
        }
    })
    .to_string()
}

/// Payload for `cmd` on `market`, keyed from the session or `instrument`.
pub fn build_payload(
    session: &Session,
    market: Market,
    cmd: u8,
    instrument: Option<&str>,
) -> ClientResult<String> {
    let command = resolve_command(market, cmd)?;
    let tr_key = match command.key {
        KeyKind::HtsId => session.hts_id(),
        KeyKind::Instrument => instrument.filter(|c| !c.is_empty()).ok_or_else(|| {
            ClientError::InvalidCommand(format!("command {cmd} needs an instrument code"))
        })?,
    };
    Ok(subscription_payload(
        session.approval_key().expose(),
        session.custtype(),
        &command,
        tr_key,
    ))
}
