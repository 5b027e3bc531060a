//! Order strategy resolution.
//!
//! Maps `(order type, with protection, absolute prices)` onto exactly one
//! [`Strategy`] and checks that the fields that strategy needs are present.

use crate::error::OrderError;
use crate::order::OrderType;
use crate::request::OrderRequest;
use rust_decimal::Decimal;
use std::fmt;

/// How the take-profit and stop-loss prices are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionSpec {
    /// Prices supplied by the client, used unchanged.
    Absolute {
        take_profit: Decimal,
        stop_loss: Decimal,
    },
    /// Fractional offsets applied to the current market price.
    Multiplier {
        take_profit: Decimal,
        stop_loss: Decimal,
    },
}

/// The placement strategy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One MARKET or LIMIT order, no protection.
    Simple,
    /// MARKET entry followed by an OCO exit on the opposite side.
    MarketWithProtection(ProtectionSpec),
    /// OCO submitted directly with client-supplied prices.
    LimitOcoAbsolute {
        take_profit: Decimal,
        stop_loss: Decimal,
    },
    /// OCO submitted directly with prices derived from the current price.
    LimitOcoDynamic {
        take_profit_multiplier: Decimal,
        stop_loss_multiplier: Decimal,
    },
}

impl Strategy {
    /// Resolve the strategy for a request. Pure; no I/O.
    pub fn resolve(req: &OrderRequest) -> Result<Self, OrderError> {
        validate_common(req)?;

        match (req.order_type, req.with_protection) {
            (OrderType::Market | OrderType::Limit, false) => Ok(Self::Simple),
            (OrderType::Market, true) => Ok(Self::MarketWithProtection(protection_spec(req)?)),
            (OrderType::Limit, true) => match protection_spec(req)? {
                ProtectionSpec::Absolute {
                    take_profit,
                    stop_loss,
                } => Ok(Self::LimitOcoAbsolute {
                    take_profit,
                    stop_loss,
                }),
                ProtectionSpec::Multiplier {
                    take_profit,
                    stop_loss,
                } => Ok(Self::LimitOcoDynamic {
                    take_profit_multiplier: take_profit,
                    stop_loss_multiplier: stop_loss,
                }),
            },
            (other, _) => Err(OrderError::InvalidRequest(format!(
                "unsupported order type {}",
                other
            ))),
        }
    }

    /// The protection parameters, if this strategy places an OCO.
    pub fn protection(&self) -> Option<ProtectionSpec> {
        match *self {
            Self::Simple => None,
            Self::MarketWithProtection(spec) => Some(spec),
            Self::LimitOcoAbsolute {
                take_profit,
                stop_loss,
            } => Some(ProtectionSpec::Absolute {
                take_profit,
                stop_loss,
            }),
            Self::LimitOcoDynamic {
                take_profit_multiplier,
                stop_loss_multiplier,
            } => Some(ProtectionSpec::Multiplier {
                take_profit: take_profit_multiplier,
                stop_loss: stop_loss_multiplier,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::MarketWithProtection(_) => "market_with_protection",
            Self::LimitOcoAbsolute { .. } => "limit_oco_absolute",
            Self::LimitOcoDynamic { .. } => "limit_oco_dynamic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn validate_common(req: &OrderRequest) -> Result<(), OrderError> {
    if req.symbol.trim().is_empty() {
        return Err(OrderError::InvalidRequest("symbol is required".into()));
    }

    let quantity: Decimal = req
        .quantity
        .trim()
        .parse()
        .map_err(|_| OrderError::InvalidRequest(format!("quantity '{}' is not a number", req.quantity)))?;
    if quantity <= Decimal::ZERO {
        return Err(OrderError::InvalidRequest("quantity must be positive".into()));
    }

    if let Some(price) = req.price {
        if price <= Decimal::ZERO {
            return Err(OrderError::InvalidRequest("price must be positive".into()));
        }
    }

    Ok(())
}

fn protection_spec(req: &OrderRequest) -> Result<ProtectionSpec, OrderError> {
    if req.use_absolute_prices {
        let take_profit = required_positive(req.take_profit_price, "tp_price")?;
        let stop_loss = required_positive(req.stop_loss_price, "sl_price")?;
        Ok(ProtectionSpec::Absolute {
            take_profit,
            stop_loss,
        })
    } else {
        let take_profit = required_positive(req.take_profit_multiplier, "tp_multiplier")?;
        let stop_loss = required_positive(req.stop_loss_multiplier, "sl_multiplier")?;
        Ok(ProtectionSpec::Multiplier {
            take_profit,
            stop_loss,
        })
    }
}

fn required_positive(value: Option<Decimal>, field: &str) -> Result<Decimal, OrderError> {
    match value {
        Some(v) if v > Decimal::ZERO => Ok(v),
        Some(_) => Err(OrderError::InvalidRequest(format!("{} must be positive", field))),
        None => Err(OrderError::InvalidRequest(format!("{} is required", field))),
    }
}
