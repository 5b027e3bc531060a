use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One 24h-ticker update, as forwarded to local subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// 24h price change in percent.
    pub change_percent: Decimal,
    pub event_time_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_serializes_prices_as_strings() {
        let tick = Tick {
            symbol: "BTCUSDT".into(),
            price: dec!(50000.10),
            change_percent: dec!(-1.25),
            event_time_ms: 1,
        };

        let json = serde_json::to_value(&tick).unwrap();
        assert_eq!(json["price"], "50000.10");
        assert_eq!(json["change_percent"], "-1.25");
    }
}
