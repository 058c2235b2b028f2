//! Command execution.
//!
//! One authenticated client per process run; each command is a short
//! sequence of calls whose result is returned as JSON for printing.
//! `finish` logs the session summary.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use clap::Subcommand;
use kis_client::{KisClient, ResponseEnvelope};
use kis_core::{Market, OverseasExchange, Price, Quantity};
use kis_telemetry::SessionStatsReporter;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

/// Exchange used when `--overseas` is given without a value.
const DEFAULT_EXCHANGE: &str = "NASD";

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Account balance and holdings.
    Balance {
        /// Overseas account on this exchange (NASD, NYSE, AMEX).
        #[arg(long, value_name = "EXC", num_args = 0..=1, default_missing_value = DEFAULT_EXCHANGE)]
        overseas: Option<OverseasExchange>,
    },
    /// Current price record.
    Price {
        code: String,
        /// Quote from an overseas exchange instead of KRX.
        #[arg(long, value_name = "EXC")]
        exchange: Option<OverseasExchange>,
    },
    /// Limit buy.
    Buy {
        code: String,
        quantity: Quantity,
        price: Price,
        #[arg(long, value_name = "EXC")]
        overseas: Option<OverseasExchange>,
    },
    /// Limit sell.
    Sell {
        code: String,
        quantity: Quantity,
        price: Price,
        #[arg(long, value_name = "EXC")]
        overseas: Option<OverseasExchange>,
    },
    /// Outstanding (cancellable) orders.
    Orders {
        #[arg(long)]
        overseas: bool,
    },
    /// Cancel every outstanding order.
    CancelAll {
        #[arg(long)]
        overseas: bool,
        /// Instrument codes to leave alone.
        #[arg(long, value_name = "CODE", num_args = 1..)]
        skip: Vec<String>,
    },
    /// Print a websocket subscription payload.
    StreamPayload {
        /// domestic, overseas or futures.
        segment: Market,
        cmd: u8,
        code: Option<String>,
    },
}

/// Main application.
pub struct Application {
    client: KisClient,
    stats: SessionStatsReporter,
}

impl Application {
    /// Authenticate and build the client.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let stats = SessionStatsReporter::new();
        let client = KisClient::connect(&config.session, config.client.options()).await?;
        Ok(Self::with_client(client, stats))
    }

    pub fn with_client(client: KisClient, stats: SessionStatsReporter) -> Self {
        Self { client, stats }
    }

    pub fn client(&self) -> &KisClient {
        &self.client
    }

    /// Run one command and return its JSON output.
    pub async fn execute(&self, command: &Command) -> AppResult<serde_json::Value> {
        info!(?command, env = %self.client.env(), "Running command");
        let client = &self.client;
        let output = match command {
            Command::Balance { overseas: None } => to_json(&client.account_balance().await)?,
            Command::Balance {
                overseas: Some(exchange),
            } => to_json(&client.overseas_balance(*exchange).await)?,

            Command::Price { code, exchange } => {
                let record = match exchange {
                    Some(exchange) => client.overseas_current_price(*exchange, code).await,
                    None => client.current_price(code).await,
                };
                record.unwrap_or(serde_json::Value::Null)
            }

            Command::Buy {
                code,
                quantity,
                price,
                overseas,
            } => {
                let envelope = match overseas {
                    Some(exchange) => client.overseas_buy(*exchange, code, *quantity, *price).await,
                    None => client.buy(code, *quantity, *price).await,
                };
                order_json(envelope)
            }
            Command::Sell {
                code,
                quantity,
                price,
                overseas,
            } => {
                let envelope = match overseas {
                    Some(exchange) => {
                        client.overseas_sell(*exchange, code, *quantity, *price).await
                    }
                    None => client.sell(code, *quantity, *price).await,
                };
                order_json(envelope)
            }

            Command::Orders { overseas: false } => to_json(&client.outstanding_orders().await)?,
            Command::Orders { overseas: true } => {
                to_json(&client.overseas_outstanding_orders(None).await)?
            }

            Command::CancelAll { overseas, skip } => {
                let report = if *overseas {
                    client.overseas_cancel_all(skip).await
                } else {
                    client.cancel_all(skip).await
                };
                if report.failed() > 0 {
                    warn!(failed = report.failed(), "Some cancellations failed");
                }
                to_json(&report)?
            }

            Command::StreamPayload { segment, cmd, code } => {
                let payload = client.stream_payload(*segment, *cmd, code.as_deref())?;
                serde_json::from_str(&payload)?
            }
        };
        Ok(output)
    }

    /// Log the session summary.
    pub fn finish(&self) {
        self.stats.output_summary();
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(AppError::from)
}

fn order_json(envelope: Option<ResponseEnvelope>) -> serde_json::Value {
    match envelope {
        Some(env) => json!({
            "accepted": env.is_success(),
            "code": env.error_code(),
            "message_code": env.message_code(),
            "message": env.error_message(),
            "signature": env.signature(),
            "output": env.field("output").cloned().unwrap_or_default(),
        }),
        None => json!({"accepted": false, "message": "no response"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use kis_client::session::SessionConfig;
    use kis_client::{ClientOptions, MockTransport, Session};
    use std::sync::Arc;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("kis").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    fn session_config() -> SessionConfig {
        toml::from_str(
            r#"
            is_paper_trading = false
            user_agent = "kis-test"
            hts_id = "htsuser"
            [live]
            base_url = "https://live.example"
            api_key = "k"
            api_secret = "s"
            stock_account_number = "11112222"
            [paper]
            base_url = "https://paper.example"
            api_key = "pk"
            api_secret = "ps"
            stock_account_number = "55556666"
            "#,
        )
        .unwrap()
    }

    fn app() -> (Application, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let session =
            Session::from_parts(&session_config(), "Bearer t".into(), "approval".into()).unwrap();
        let client = KisClient::from_session(session, mock.clone(), ClientOptions::default());
        (Application::with_client(client, SessionStatsReporter::new()), mock)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse(&["balance"]), Command::Balance { overseas: None });
        assert_eq!(
            parse(&["balance", "--overseas"]),
            Command::Balance {
                overseas: Some(OverseasExchange::Nasdaq)
            }
        );
        assert_eq!(
            parse(&["buy", "005930", "10", "70000"]),
            Command::Buy {
                code: "005930".to_string(),
                quantity: Quantity::new(10),
                price: "70000".parse().unwrap(),
                overseas: None,
            }
        );
        assert_eq!(
            parse(&["cancel-all", "--skip", "005930", "000660"]),
            Command::CancelAll {
                overseas: false,
                skip: vec!["005930".to_string(), "000660".to_string()],
            }
        );
        assert_eq!(
            parse(&["stream-payload", "futures", "0", "101V09"]),
            Command::StreamPayload {
                segment: Market::FuturesOptions,
                cmd: 0,
                code: Some("101V09".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let cli = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("kis").chain(args.iter().copied()))
        };
        assert!(cli(&["buy", "005930", "1.5", "70000"]).is_err());
        assert!(cli(&["price", "AAPL", "--exchange", "TSE"]).is_err());
    }

    #[tokio::test]
    async fn test_stream_payload_command() {
        let (app, mock) = app();
        let out = tokio_test::assert_ok!(
            app.execute(&Command::StreamPayload {
                segment: Market::Domestic,
                cmd: 5,
                code: None,
            })
            .await
        );
        assert_eq!(out["body"]["input"]["tr_id"], "H0STCNI0");
        assert_eq!(out["body"]["input"]["tr_key"], "htsuser");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_stream_payload_invalid_command_is_error() {
        let (app, _mock) = app();
        let result = app
            .execute(&Command::StreamPayload {
                segment: Market::Overseas,
                cmd: 7,
                code: Some("AAPL".to_string()),
            })
            .await;
        assert!(matches!(result, Err(AppError::Client(_))));
    }

    #[tokio::test]
    async fn test_orders_command_on_failure_prints_empty_list() {
        let (app, _mock) = app();
        let out = app.execute(&Command::Orders { overseas: false }).await.unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_buy_without_response() {
        let (app, mock) = app();
        mock.fail("/uapi/hashkey", "connection reset");
        let out = app
            .execute(&Command::Buy {
                code: "005930".to_string(),
                quantity: Quantity::new(1),
                price: Price::ZERO,
                overseas: None,
            })
            .await
            .unwrap();
        assert_eq!(out["accepted"], false);
        assert_eq!(out["message"], "no response");
    }
}
