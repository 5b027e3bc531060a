//! Inbound order request as handed over by the request-handling layer.

use crate::order::{OrderSide, OrderType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A normalized order request.
///
/// Field names on the wire follow the public API (`with_tpsl`,
/// `use_absolute`, `tp_price`, ...). Which optional fields are required
/// depends on the flags; see [`crate::Strategy::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Quantity exactly as the client sent it; forwarded to the exchange verbatim.
    pub quantity: String,
    /// Explicit limit price. LIMIT orders without one are priced from the oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, rename = "with_tpsl")]
    pub with_protection: bool,
    #[serde(default, rename = "use_absolute")]
    pub use_absolute_prices: bool,
    #[serde(default, rename = "tp_price", skip_serializing_if = "Option::is_none")]
    pub take_profit_price: Option<Decimal>,
    #[serde(default, rename = "sl_price", skip_serializing_if = "Option::is_none")]
    pub stop_loss_price: Option<Decimal>,
    #[serde(default, rename = "tp_multiplier", skip_serializing_if = "Option::is_none")]
    pub take_profit_multiplier: Option<Decimal>,
    #[serde(default, rename = "sl_multiplier", skip_serializing_if = "Option::is_none")]
    pub stop_loss_multiplier: Option<Decimal>,
}

impl OrderRequest {
    fn base(symbol: &str, side: OrderSide, order_type: OrderType, quantity: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type,
            quantity: quantity.to_string(),
            price: None,
            with_protection: false,
            use_absolute_prices: false,
            take_profit_price: None,
            stop_loss_price: None,
            take_profit_multiplier: None,
            stop_loss_multiplier: None,
        }
    }

    pub fn market(symbol: &str, side: OrderSide, quantity: &str) -> Self {
        Self::base(symbol, side, OrderType::Market, quantity)
    }

    pub fn limit(symbol: &str, side: OrderSide, quantity: &str) -> Self {
        Self::base(symbol, side, OrderType::Limit, quantity)
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Request TP/SL legs derived from the current price.
    pub fn with_multipliers(mut self, take_profit: Decimal, stop_loss: Decimal) -> Self {
        self.with_protection = true;
        self.use_absolute_prices = false;
        self.take_profit_multiplier = Some(take_profit);
        self.stop_loss_multiplier = Some(stop_loss);
        self
    }

    /// Request TP/SL legs at fixed prices.
    pub fn with_absolute_prices(mut self, take_profit: Decimal, stop_loss: Decimal) -> Self {
        self.with_protection = true;
        self.use_absolute_prices = true;
        self.take_profit_price = Some(take_profit);
        self.stop_loss_price = Some(stop_loss);
        self
    }
}
