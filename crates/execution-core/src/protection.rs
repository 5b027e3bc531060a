//! Take-profit / stop-loss leg construction and validation.

use crate::error::OrderError;
use crate::order::OrderSide;
use crate::strategy::ProtectionSpec;
use rust_decimal::Decimal;

/// Offset between the stop trigger and the stop-limit price (0.1%).
pub const STOP_LIMIT_BUFFER: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Prices for the contingent exit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionLegs {
    /// Side of the OCO order, opposite to the entry.
    pub exit_side: OrderSide,
    pub take_profit_price: Decimal,
    /// Stop trigger.
    pub stop_loss_price: Decimal,
    /// Limit price of the stop leg once triggered.
    pub stop_limit_price: Decimal,
}

/// Compute and validate protection legs for an entry on `entry_side`.
///
/// `current_price` is required for [`ProtectionSpec::Multiplier`]. When it is
/// present the legs are also checked against it: for BUY entries the
/// take-profit must be above and the stop-loss below it, mirrored for SELL.
/// Independently of the price, the stop-loss must sit on the losing side of
/// the take-profit (`sl < tp` for BUY entries, `sl > tp` for SELL entries).
pub fn build_legs(
    entry_side: OrderSide,
    current_price: Option<Decimal>,
    spec: &ProtectionSpec,
) -> Result<ProtectionLegs, OrderError> {
    let (take_profit, stop_loss) = match *spec {
        ProtectionSpec::Absolute {
            take_profit,
            stop_loss,
        } => (take_profit, stop_loss),
        ProtectionSpec::Multiplier {
            take_profit,
            stop_loss,
        } => {
            let price = current_price.ok_or_else(|| {
                OrderError::InvalidRequest("current price required for multiplier protection".into())
            })?;
            match entry_side {
                OrderSide::Buy => (
                    offset(price, take_profit, Direction::Up)?,
                    offset(price, stop_loss, Direction::Down)?,
                ),
                OrderSide::Sell => (
                    offset(price, take_profit, Direction::Down)?,
                    offset(price, stop_loss, Direction::Up)?,
                ),
            }
        }
    };

    if take_profit <= Decimal::ZERO || stop_loss <= Decimal::ZERO {
        return Err(OrderError::InvalidProtectionPrices(format!(
            "prices must be positive (tp {}, sl {})",
            take_profit, stop_loss
        )));
    }

    validate_ordering(entry_side, take_profit, stop_loss)?;

    if let Some(price) = current_price {
        validate_against_price(entry_side, price, take_profit, stop_loss)?;
    }

    let stop_limit_price = match entry_side {
        // SELL exit: the limit sits just below the trigger so it still crosses.
        OrderSide::Buy => offset(stop_loss, STOP_LIMIT_BUFFER, Direction::Down)?,
        OrderSide::Sell => offset(stop_loss, STOP_LIMIT_BUFFER, Direction::Up)?,
    };

    Ok(ProtectionLegs {
        exit_side: entry_side.opposite(),
        take_profit_price: take_profit,
        stop_loss_price: stop_loss,
        stop_limit_price,
    })
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// `price * (1 ± fraction)`, failing instead of overflowing.
fn offset(price: Decimal, fraction: Decimal, direction: Direction) -> Result<Decimal, OrderError> {
    let factor = match direction {
        Direction::Up => Decimal::ONE.checked_add(fraction),
        Direction::Down => Decimal::ONE.checked_sub(fraction),
    };
    factor
        .and_then(|f| price.checked_mul(f))
        .ok_or_else(|| {
            OrderError::InvalidProtectionPrices(format!(
                "price {} offset by {} is out of range",
                price, fraction
            ))
        })
}

fn validate_ordering(
    entry_side: OrderSide,
    take_profit: Decimal,
    stop_loss: Decimal,
) -> Result<(), OrderError> {
    let ordered = match entry_side {
        OrderSide::Buy => stop_loss < take_profit,
        OrderSide::Sell => stop_loss > take_profit,
    };
    if ordered {
        Ok(())
    } else {
        Err(OrderError::InvalidPriceOrdering(format!(
            "stop-loss {} is on the wrong side of take-profit {} for a {} entry",
            stop_loss, take_profit, entry_side
        )))
    }
}

fn validate_against_price(
    entry_side: OrderSide,
    price: Decimal,
    take_profit: Decimal,
    stop_loss: Decimal,
) -> Result<(), OrderError> {
    match entry_side {
        OrderSide::Buy if take_profit <= price || stop_loss >= price => {
            Err(OrderError::InvalidProtectionPrices(format!(
                "for BUY entries TP must be above and SL below the current price {} (tp {}, sl {})",
                price, take_profit, stop_loss
            )))
        }
        OrderSide::Sell if take_profit >= price || stop_loss <= price => {
            Err(OrderError::InvalidProtectionPrices(format!(
                "for SELL entries TP must be below and SL above the current price {} (tp {}, sl {})",
                price, take_profit, stop_loss
            )))
        }
        _ => Ok(()),
    }
}

/// Render a price with eight decimal places, as the exchange expects.
pub fn format_price(price: Decimal) -> String {
    format!("{:.8}", price.round_dp(8))
}
