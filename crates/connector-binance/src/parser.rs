use model::Tick;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw Binance 24hr ticker event. Only the fields the relay forwards are kept.
#[derive(Debug, Deserialize)]
pub struct BinanceTickerRaw {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    /// Last price.
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "P")]
    pub price_change_percent: Decimal,
}

/// Combined stream wrapper that holds generic event data.
#[derive(Debug, Deserialize)]
pub struct CombinedStreamWrapperGeneric {
    pub stream: String,
    pub data: serde_json::Value,
}

#[derive(Debug)]
pub enum ParsedMessage {
    Ticker(Tick),
    Unknown,
}

impl From<BinanceTickerRaw> for Tick {
    fn from(raw: BinanceTickerRaw) -> Self {
        Tick {
            symbol: raw.symbol,
            price: raw.last_price,
            change_percent: raw.price_change_percent,
            event_time_ms: raw.event_time,
        }
    }
}

/// Strip the `{stream, data}` envelope of combined streams, if present.
pub(crate) fn unwrap_envelope(
    value: serde_json::Value,
) -> Result<serde_json::Value, serde_json::Error> {
    if value.get("stream").is_some() {
        let wrapper: CombinedStreamWrapperGeneric = serde_json::from_value(value)?;
        return Ok(wrapper.data);
    }
    Ok(value)
}

pub fn parse_message(text: &str) -> Result<ParsedMessage, serde_json::Error> {
    let value = unwrap_envelope(serde_json::from_str(text)?)?;

    match value.get("e").and_then(|v| v.as_str()) {
        Some("24hrTicker") => {
            let raw: BinanceTickerRaw = serde_json::from_value(value)?;
            Ok(ParsedMessage::Ticker(raw.into()))
        }
        _ => Ok(ParsedMessage::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TICKER: &str = r#"{
        "e": "24hrTicker",
        "E": 1672515782136,
        "s": "BTCUSDT",
        "p": "-94.99999800",
        "P": "-0.950",
        "w": "0.29628482",
        "c": "23456.78000000",
        "Q": "10.00000000",
        "o": "23551.78000000",
        "h": "23600.00000000",
        "l": "23000.00000000",
        "v": "40000.00000000",
        "q": "18.00000000",
        "O": 0,
        "C": 86400000,
        "F": 0,
        "L": 18150,
        "n": 18151
    }"#;

    #[test]
    fn test_parse_raw_ticker() {
        match parse_message(TICKER).unwrap() {
            ParsedMessage::Ticker(tick) => {
                assert_eq!(tick.symbol, "BTCUSDT");
                assert_eq!(tick.price, dec!(23456.78));
                assert_eq!(tick.change_percent, dec!(-0.95));
                assert_eq!(tick.event_time_ms, 1672515782136);
            }
            other => panic!("Expected Ticker, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_combined_stream_ticker() {
        let json = format!(r#"{{"stream": "btcusdt@ticker", "data": {}}}"#, TICKER);

        match parse_message(&json).unwrap() {
            ParsedMessage::Ticker(tick) => assert_eq!(tick.symbol, "BTCUSDT"),
            other => panic!("Expected Ticker, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_event() {
        let json = r#"{"e": "trade", "E": 1672515782136, "s": "BTCUSDT"}"#;
        assert!(matches!(parse_message(json).unwrap(), ParsedMessage::Unknown));
    }

    #[test]
    fn test_parse_subscription_ack_is_unknown() {
        let json = r#"{"result": null, "id": 1}"#;
        assert!(matches!(parse_message(json).unwrap(), ParsedMessage::Unknown));
    }

    #[test]
    fn test_parse_malformed_ticker_is_error() {
        let json = r#"{"e": "24hrTicker", "E": 1, "s": "BTCUSDT", "c": "not-a-number", "P": "1"}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        assert!(parse_message("not json").is_err());
    }
}
