//! Binance API response types.

use execution_core::{OrderSide, OrderStatus, OrderType};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Response from GET /api/v3/time.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// Response from POST /api/v3/userDataStream.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}

/// Response from GET /api/v3/ticker/price.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
}

/// Response from POST /api/v3/order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderResponse {
    pub symbol: String,
    #[serde(rename = "orderId")]
    pub order_id: i64,
    #[serde(rename = "orderListId", default = "no_order_list")]
    pub order_list_id: i64,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    #[serde(rename = "transactTime")]
    pub transact_time: i64,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
    #[serde(rename = "origQty", deserialize_with = "deserialize_decimal_from_str")]
    pub orig_qty: Decimal,
    #[serde(
        rename = "executedQty",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub executed_qty: Decimal,
    #[serde(
        rename = "cummulativeQuoteQty",
        deserialize_with = "deserialize_decimal_from_str"
    )]
    pub cummulative_quote_qty: Decimal,
    pub status: OrderStatus,
    #[serde(rename = "timeInForce")]
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    /// Present with `newOrderRespType=FULL` (the default for MARKET orders).
    #[serde(default)]
    pub fills: Vec<OrderFill>,
}

impl NewOrderResponse {
    /// Volume-weighted fill price, falling back to the order price.
    ///
    /// MARKET orders report `price` as zero, so the fills are the only
    /// place the execution price shows up.
    pub fn average_fill_price(&self) -> Decimal {
        if !self.executed_qty.is_zero() && !self.cummulative_quote_qty.is_zero() {
            return self.cummulative_quote_qty / self.executed_qty;
        }
        self.price
    }
}

/// A fill from an order response.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderFill {
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub qty: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub commission: Decimal,
    #[serde(rename = "commissionAsset")]
    pub commission_asset: String,
    #[serde(rename = "tradeId")]
    pub trade_id: i64,
}

/// Response from POST /api/v3/order/oco and DELETE /api/v3/orderList.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub order_list_id: i64,
    pub contingency_type: String,
    pub list_status_type: String,
    pub list_order_status: String,
    pub list_client_order_id: String,
    pub transaction_time: i64,
    pub symbol: String,
    pub orders: Vec<OrderListEntry>,
    #[serde(default)]
    pub order_reports: Vec<OrderReport>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListEntry {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
}

/// One leg of an order list as reported by the exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReport {
    pub symbol: String,
    pub order_id: i64,
    pub order_list_id: i64,
    pub client_order_id: String,
    pub transact_time: i64,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub orig_qty: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub executed_qty: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub cummulative_quote_qty: Decimal,
    pub status: OrderStatus,
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    /// Only the stop leg carries a trigger.
    #[serde(default, deserialize_with = "deserialize_opt_decimal_from_str")]
    pub stop_price: Option<Decimal>,
}

fn no_order_list() -> i64 {
    -1
}

/// Deserialize a Decimal from a string.
fn deserialize_decimal_from_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: &str = Deserialize::deserialize(deserializer)?;
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}

fn deserialize_opt_decimal_from_str<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<&str> = Deserialize::deserialize(deserializer)?;
    s.map(|s| s.parse::<Decimal>().map_err(serde::de::Error::custom))
        .transpose()
}
