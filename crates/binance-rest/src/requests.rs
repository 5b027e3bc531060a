//! Order payloads and their canonical parameter order.

use execution_core::{
    format_price, generate_client_order_id, OrderSide, OrderType, ProtectionLegs, TimeInForce,
    CLIENT_ORDER_ID_PREFIX,
};
use rust_decimal::Decimal;

/// A single order for `POST /api/v3/order`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Sent verbatim.
    pub quantity: String,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub client_order_id: String,
}

impl NewOrder {
    pub fn market(symbol: &str, side: OrderSide, quantity: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity: quantity.to_string(),
            price: None,
            time_in_force: None,
            client_order_id: generate_client_order_id(CLIENT_ORDER_ID_PREFIX),
        }
    }

    /// Good-till-canceled limit order.
    pub fn limit(symbol: &str, side: OrderSide, quantity: &str, price: Decimal) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            time_in_force: Some(TimeInForce::GTC),
            ..Self::market(symbol, side, quantity)
        }
    }

    /// Parameters before `recvWindow`/`timestamp`/`signature`.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("side", self.side.as_binance_str().to_string()),
            ("type", self.order_type.as_binance_str().to_string()),
            ("quantity", self.quantity.clone()),
        ];

        if let Some(price) = self.price {
            params.push(("price", format_price(price)));
        }
        if let Some(tif) = self.time_in_force {
            params.push(("timeInForce", tif.as_binance_str().to_string()));
        }
        params.push(("newClientOrderId", self.client_order_id.clone()));

        params
    }
}

/// A take-profit/stop-loss pair for `POST /api/v3/order/oco`.
#[derive(Debug, Clone, PartialEq)]
pub struct OcoOrder {
    pub symbol: String,
    pub quantity: String,
    pub legs: ProtectionLegs,
    /// Fixed for the lifetime of the request so the list can be looked up
    /// after an ambiguous failure.
    pub list_client_order_id: String,
}

impl OcoOrder {
    pub fn new(symbol: &str, quantity: &str, legs: ProtectionLegs) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity: quantity.to_string(),
            legs,
            list_client_order_id: generate_client_order_id(CLIENT_ORDER_ID_PREFIX),
        }
    }

    pub fn side(&self) -> OrderSide {
        self.legs.exit_side
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", self.symbol.clone()),
            ("side", self.legs.exit_side.as_binance_str().to_string()),
            ("quantity", self.quantity.clone()),
            ("price", format_price(self.legs.take_profit_price)),
            ("stopPrice", format_price(self.legs.stop_loss_price)),
            ("stopLimitPrice", format_price(self.legs.stop_limit_price)),
            ("stopLimitTimeInForce", TimeInForce::GTC.as_binance_str().to_string()),
            ("listClientOrderId", self.list_client_order_id.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn keys(params: &[(&'static str, String)]) -> Vec<&'static str> {
        params.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_market_order_params() {
        let order = NewOrder::market("BTCUSDT", OrderSide::Buy, "0.01");
        let params = order.params();

        assert_eq!(keys(&params), vec!["symbol", "side", "type", "quantity", "newClientOrderId"]);
        assert_eq!(params[2].1, "MARKET");
        assert_eq!(params[3].1, "0.01");
        assert!(params[4].1.starts_with("gw_"));
    }

    #[test]
    fn test_limit_order_params() {
        let order = NewOrder::limit("ETHUSDT", OrderSide::Sell, "1.5", dec!(1850.5));
        let params = order.params();

        assert_eq!(
            keys(&params),
            vec!["symbol", "side", "type", "quantity", "price", "timeInForce", "newClientOrderId"]
        );
        assert_eq!(params[4].1, "1850.50000000");
        assert_eq!(params[5].1, "GTC");
    }

    #[test]
    fn test_oco_list_id_is_stable_per_request() {
        let legs = ProtectionLegs {
            exit_side: OrderSide::Buy,
            take_profit_price: dec!(1900),
            stop_loss_price: dec!(2100),
            stop_limit_price: dec!(2102.1),
        };
        let order = OcoOrder::new("ETHUSDT", "1", legs);

        assert_eq!(order.params(), order.params());
        assert_ne!(
            order.list_client_order_id,
            OcoOrder::new("ETHUSDT", "1", legs).list_client_order_id
        );
    }

    #[test]
    fn test_oco_params() {
        let legs = ProtectionLegs {
            exit_side: OrderSide::Sell,
            take_profit_price: dec!(51000),
            stop_loss_price: dec!(49500),
            stop_limit_price: dec!(49450.5),
        };
        let order = OcoOrder::new("BTCUSDT", "0.01", legs);
        let params = order.params();

        assert!(order.list_client_order_id.starts_with("gw_"));
        assert_eq!(
            params,
            vec![
                ("symbol", "BTCUSDT".to_string()),
                ("side", "SELL".to_string()),
                ("quantity", "0.01".to_string()),
                ("price", "51000.00000000".to_string()),
                ("stopPrice", "49500.00000000".to_string()),
                ("stopLimitPrice", "49450.50000000".to_string()),
                ("stopLimitTimeInForce", "GTC".to_string()),
                ("listClientOrderId", order.list_client_order_id.clone()),
            ]
        );
    }
}
