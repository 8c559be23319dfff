//! Cost Schedule Builder: effective purchase price per ingredient and day.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::calendar::{check_day, DEFAULT_DISCOUNT_DAY, HORIZON};
use crate::catalog::Catalog;
use crate::error::ConfigurationError;
use crate::table::DayTable;

pub const DEFAULT_DISCOUNT_RATE: f64 = 0.15;

/// Price reduction applied to every ingredient on one day of the week.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub day: usize,
    pub rate: f64,
}

impl Default for DiscountRule {
    fn default() -> Self {
        Self {
            day: DEFAULT_DISCOUNT_DAY,
            rate: DEFAULT_DISCOUNT_RATE,
        }
    }
}

impl DiscountRule {
    pub fn new(day: usize, rate: f64) -> Result<Self, ConfigurationError> {
        let rule = Self { day, rate };
        rule.validate()?;
        Ok(rule)
    }

    /// Default discount day with the given rate.
    pub fn with_rate(rate: f64) -> Result<Self, ConfigurationError> {
        Self::new(DEFAULT_DISCOUNT_DAY, rate)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_rate(self.rate)?;
        check_day(self.day)?;
        Ok(())
    }

    /// Multiplier on the base price for `day`.
    pub fn multiplier(&self, day: usize) -> f64 {
        if day == self.day {
            1.0 - self.rate
        } else {
            1.0
        }
    }
}

pub(crate) fn check_rate(rate: f64) -> Result<f64, ConfigurationError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigurationError::DiscountRateOutOfRange(rate))
    }
}

/// Undiscounted cost inputs of a planning run. The sensitivity driver varies these.
#[derive(Clone, Debug, PartialEq)]
pub struct CostParameters {
    pub labels: Vec<String>,
    pub base_prices: Array1<f64>,
    pub holding_costs: Array1<f64>,
    pub discount: DiscountRule,
}

impl CostParameters {
    pub fn from_catalog(catalog: &Catalog, discount: DiscountRule) -> Self {
        Self {
            labels: catalog.ingredient_names(),
            base_prices: catalog.base_prices(),
            holding_costs: catalog.holding_costs(),
            discount,
        }
    }

    pub fn price_schedule(&self) -> Result<DayTable, ConfigurationError> {
        build_cost_schedule(&self.labels, &self.base_prices, &self.discount)
    }
}

/// Ingredient × day price table: the base price everywhere except the discount day.
pub fn build_cost_schedule(
    labels: &[String],
    base_prices: &Array1<f64>,
    discount: &DiscountRule,
) -> Result<DayTable, ConfigurationError> {
    discount.validate()?;
    if base_prices.len() != labels.len() {
        return Err(ConfigurationError::ShapeMismatch {
            what: "base prices",
            expected: labels.len(),
            found: base_prices.len(),
        });
    }

    let prices = Array2::from_shape_fn((labels.len(), HORIZON), |(i, day)| {
        base_prices[i] * discount.multiplier(day)
    });
    DayTable::new(labels.to_vec(), prices)
}
