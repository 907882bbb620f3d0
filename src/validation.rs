//! Order Validator - Admission Rules
//!
//! Every order passes through the validator before it receives a sequence id.
//! A rejected order never touches the book.
//!
//! ## Validation Rules
//! - Price must be strictly positive
//! - Quantity must be strictly positive
//! - Price must lie within the configured bounds and on the tick grid
//! - Quantity must not exceed the configured maximum
//!
//! ## Usage
//! ```rust
//! use lob_engine::protocol::NewOrder;
//! use lob_engine::validation::{OrderValidator, ValidationError};
//! use rust_decimal::Decimal;
//!
//! let validator = OrderValidator::new();
//! let order = NewOrder::buy(Decimal::from(-5), Decimal::ONE);
//! assert!(matches!(
//!     validator.validate(&order),
//!     Err(ValidationError::NonPositivePrice(_))
//! ));
//! ```

use crate::protocol::{NewOrder, Price, Quantity, Side};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Price is zero or negative
    #[error("price must be greater than zero, got {0}")]
    NonPositivePrice(Price),

    /// Quantity is zero or negative
    #[error("quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(Quantity),

    /// Price below the configured minimum
    #[error("price {price} is below minimum {min}")]
    PriceBelowMinimum { price: Price, min: Price },

    /// Price above the configured maximum
    #[error("price {price} exceeds maximum {max}")]
    PriceAboveMaximum { price: Price, max: Price },

    /// Price not on the tick grid
    #[error("price {price} is not a multiple of tick size {tick_size}")]
    OffTick { price: Price, tick_size: Price },

    /// Quantity above the configured maximum
    #[error("quantity {quantity} exceeds maximum {max}")]
    QuantityAboveMaximum { quantity: Quantity, max: Quantity },

    /// Resting the order could push the side's total volume past `Decimal::MAX`
    #[error("quantity {quantity} would overflow the resting {side} volume")]
    VolumeOverflow { side: Side, quantity: Quantity },
}

/// Order validation configuration
///
/// Every limit is optional; the default configuration only enforces
/// positivity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum price (inclusive)
    pub min_price: Option<Price>,

    /// Maximum price (inclusive)
    pub max_price: Option<Price>,

    /// Maximum quantity (inclusive)
    pub max_quantity: Option<Quantity>,

    /// Price increment; prices must be integer multiples of it
    pub tick_size: Option<Price>,
}

/// Order validator
#[derive(Debug, Clone, Default)]
pub struct OrderValidator {
    config: ValidationConfig,
}

impl OrderValidator {
    /// Creates a validator that only enforces positivity
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new validator with custom configuration
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validates an order request
    ///
    /// Positivity is checked before any configured limit, so a negative
    /// price always reports `NonPositivePrice`.
    pub fn validate(&self, order: &NewOrder) -> Result<(), ValidationError> {
        self.validate_price(order.price)?;
        self.validate_quantity(order.quantity)?;
        Ok(())
    }

    fn validate_price(&self, price: Price) -> Result<(), ValidationError> {
        if price <= Price::ZERO {
            return Err(ValidationError::NonPositivePrice(price));
        }

        if let Some(min) = self.config.min_price {
            if price < min {
                return Err(ValidationError::PriceBelowMinimum { price, min });
            }
        }

        if let Some(max) = self.config.max_price {
            if price > max {
                return Err(ValidationError::PriceAboveMaximum { price, max });
            }
        }

        if let Some(tick_size) = self.config.tick_size {
            // 非正的tick配置视为未设置
            let on_tick = price
                .checked_rem(tick_size)
                .is_some_and(|rest| rest.is_zero());
            if tick_size > Price::ZERO && !on_tick {
                return Err(ValidationError::OffTick { price, tick_size });
            }
        }

        Ok(())
    }

    fn validate_quantity(&self, quantity: Quantity) -> Result<(), ValidationError> {
        if quantity <= Quantity::ZERO {
            return Err(ValidationError::NonPositiveQuantity(quantity));
        }

        if let Some(max) = self.config.max_quantity {
            if quantity > max {
                return Err(ValidationError::QuantityAboveMaximum { quantity, max });
            }
        }

        Ok(())
    }
}
