//! User data stream message parser.
//!
//! Only `executionReport` events are decoded; balance and list-status
//! events on the same stream come back as [`UserDataMessage::Unknown`].

use crate::parser::unwrap_envelope;
use execution_core::{ExecutionReport, ExecutionType, OrderSide, OrderStatus, OrderType};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw execution report from Binance WebSocket.
#[derive(Debug, Deserialize)]
pub struct BinanceExecutionReportRaw {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub client_order_id: String,
    #[serde(rename = "S")]
    pub side: OrderSide,
    #[serde(rename = "o")]
    pub order_type: OrderType,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "P", default)]
    pub stop_price: Decimal,
    /// Current execution type
    #[serde(rename = "x")]
    pub execution_type: ExecutionType,
    /// Current order status
    #[serde(rename = "X")]
    pub order_status: OrderStatus,
    #[serde(rename = "r", default = "no_reject_reason")]
    pub reject_reason: String,
    #[serde(rename = "i")]
    pub order_id: i64,
    /// Order list id, -1 outside an OCO
    #[serde(rename = "g", default = "minus_one")]
    pub order_list_id: i64,
    #[serde(rename = "l")]
    pub last_executed_qty: Decimal,
    #[serde(rename = "z")]
    pub cumulative_filled_qty: Decimal,
    #[serde(rename = "L")]
    pub last_executed_price: Decimal,
    #[serde(rename = "n", default)]
    pub commission: Decimal,
    /// Null until the first trade
    #[serde(rename = "N", default)]
    pub commission_asset: Option<String>,
    /// Transaction time
    #[serde(rename = "T")]
    pub transaction_time: i64,
    /// Trade ID (-1 if no trade)
    #[serde(rename = "t", default = "minus_one")]
    pub trade_id: i64,
}

fn no_reject_reason() -> String {
    "NONE".to_string()
}

fn minus_one() -> i64 {
    -1
}

/// Parsed user data message.
#[derive(Debug)]
pub enum UserDataMessage {
    ExecutionReport(ExecutionReport),
    /// Any other event type; ignored by the consumer.
    Unknown,
}

/// Parse a user data stream message, raw or wrapped in `{stream, data}`.
pub fn parse_user_data_message(text: &str) -> Result<UserDataMessage, serde_json::Error> {
    let value = unwrap_envelope(serde_json::from_str(text)?)?;

    match value.get("e").and_then(|v| v.as_str()) {
        Some("executionReport") => {
            let raw: BinanceExecutionReportRaw = serde_json::from_value(value)?;
            Ok(UserDataMessage::ExecutionReport(raw.into()))
        }
        _ => Ok(UserDataMessage::Unknown),
    }
}

impl From<BinanceExecutionReportRaw> for ExecutionReport {
    fn from(raw: BinanceExecutionReportRaw) -> Self {
        ExecutionReport {
            event_time_ms: raw.event_time,
            symbol: raw.symbol,
            client_order_id: raw.client_order_id,
            side: raw.side,
            order_type: raw.order_type,
            quantity: raw.quantity,
            price: raw.price,
            stop_price: raw.stop_price,
            execution_type: raw.execution_type,
            order_status: raw.order_status,
            reject_reason: raw.reject_reason,
            order_id: raw.order_id,
            order_list_id: raw.order_list_id,
            last_executed_qty: raw.last_executed_qty,
            cumulative_filled_qty: raw.cumulative_filled_qty,
            last_executed_price: raw.last_executed_price,
            commission: raw.commission,
            commission_asset: raw.commission_asset,
            transaction_time_ms: raw.transaction_time,
            trade_id: raw.trade_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FILLED: &str = r#"{
        "e": "executionReport",
        "E": 1499405658658,
        "s": "BTCUSDT",
        "c": "gw_3f1c2a9b8d7e4f60a1b2c3d4e5f60718",
        "S": "BUY",
        "o": "MARKET",
        "f": "GTC",
        "q": "0.01000000",
        "p": "0.00000000",
        "P": "0.00000000",
        "F": "0.00000000",
        "g": -1,
        "C": "",
        "x": "TRADE",
        "X": "FILLED",
        "r": "NONE",
        "i": 4293153,
        "l": "0.01000000",
        "z": "0.01000000",
        "L": "50000.00000000",
        "n": "0.00001000",
        "N": "BTC",
        "T": 1499405658657,
        "t": 990,
        "I": 8641984,
        "w": false,
        "m": false,
        "M": true,
        "O": 1499405658657,
        "Z": "500.00000000",
        "Y": "500.00000000",
        "Q": "0.00000000"
    }"#;

    #[test]
    fn test_parse_execution_report() {
        match parse_user_data_message(FILLED).unwrap() {
            UserDataMessage::ExecutionReport(report) => {
                assert_eq!(report.symbol, "BTCUSDT");
                assert_eq!(report.order_id, 4293153);
                assert_eq!(report.side, OrderSide::Buy);
                assert_eq!(report.order_type, OrderType::Market);
                assert_eq!(report.execution_type, ExecutionType::Trade);
                assert_eq!(report.order_status, OrderStatus::Filled);
                assert_eq!(report.cumulative_filled_qty, dec!(0.01));
                assert_eq!(report.last_executed_price, dec!(50000));
                assert_eq!(report.commission_asset.as_deref(), Some("BTC"));
                assert_eq!(report.reject_reason, "NONE");
                assert_eq!(report.order_list_id, -1);
                assert!(report.is_complete_fill());
            }
            other => panic!("Expected ExecutionReport, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_wrapped_execution_report() {
        let json = format!(r#"{{"stream": "listen-key", "data": {}}}"#, FILLED);

        match parse_user_data_message(&json).unwrap() {
            UserDataMessage::ExecutionReport(report) => assert_eq!(report.order_id, 4293153),
            other => panic!("Expected ExecutionReport, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_order_with_null_commission_asset() {
        let json = r#"{
            "e": "executionReport",
            "E": 1499405658658,
            "s": "ETHBTC",
            "c": "mUvoqJxFIILMdfAW5iGSOW",
            "S": "SELL",
            "o": "LIMIT_MAKER",
            "f": "GTC",
            "q": "1.00000000",
            "p": "0.10264410",
            "P": "0.00000000",
            "g": 29,
            "x": "NEW",
            "X": "NEW",
            "r": "NONE",
            "i": 4293154,
            "l": "0.00000000",
            "z": "0.00000000",
            "L": "0.00000000",
            "n": "0",
            "N": null,
            "T": 1499405658657,
            "t": -1,
            "m": false
        }"#;

        match parse_user_data_message(json).unwrap() {
            UserDataMessage::ExecutionReport(report) => {
                assert_eq!(report.order_type, OrderType::LimitMaker);
                assert_eq!(report.order_list_id, 29);
                assert!(report.commission_asset.is_none());
                assert_eq!(report.trade_id, -1);
                assert!(!report.is_complete_fill());
            }
            other => panic!("Expected ExecutionReport, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejected_report_keeps_reason() {
        let json = FILLED
            .replace(r#""x": "TRADE""#, r#""x": "REJECTED""#)
            .replace(r#""X": "FILLED""#, r#""X": "REJECTED""#)
            .replace(r#""r": "NONE""#, r#""r": "INSUFFICIENT_BALANCE""#);

        match parse_user_data_message(&json).unwrap() {
            UserDataMessage::ExecutionReport(report) => {
                assert_eq!(report.order_status, OrderStatus::Rejected);
                assert_eq!(report.reject_reason, "INSUFFICIENT_BALANCE");
            }
            other => panic!("Expected ExecutionReport, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_account_position_is_unknown() {
        let json = r#"{
            "e": "outboundAccountPosition",
            "E": 1564034571105,
            "u": 1564034571073,
            "B": [{"a": "ETH", "f": "10000.000000", "l": "0.000000"}]
        }"#;

        let result = parse_user_data_message(json).unwrap();
        assert!(matches!(result, UserDataMessage::Unknown));
    }

    #[test]
    fn test_parse_unknown_status_is_error() {
        let json = FILLED.replace(r#""X": "FILLED""#, r#""X": "SOMETHING_NEW""#);
        assert!(parse_user_data_message(&json).is_err());
    }
}
