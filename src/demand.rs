//! Demand Aggregator: daily unit sales per product → daily kg per ingredient.

use log::debug;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::calendar::HORIZON;
use crate::catalog::Catalog;
use crate::error::ConfigurationError;
use crate::table::DayTable;

/// Forecast given to a newly designed product until real numbers exist.
pub const PLACEHOLDER_FORECAST: [u32; HORIZON] = [50, 45, 55, 100, 120, 110, 65];

/// Units sold per product per day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesForecast {
    units: BTreeMap<String, [u32; HORIZON]>,
}

impl SalesForecast {
    pub fn new() -> Self {
        Self::default()
    }

    /// The predicted week shipped with the coffee shop catalog.
    pub fn coffee_shop_prediction() -> Self {
        let mut forecast = Self::new();
        forecast.insert("Cappuccino", [51, 48, 55, 113, 136, 112, 69]);
        forecast.insert("Latte", [80, 43, 56, 94, 120, 140, 64]);
        forecast.insert("Mocha", [55, 45, 58, 131, 165, 132, 83]);
        forecast
    }

    /// Same number of units every day for every product of `catalog`.
    pub fn flat(catalog: &Catalog, units_per_day: u32) -> Self {
        let mut forecast = Self::new();
        for product in catalog.products() {
            forecast.insert(&product.name, [units_per_day; HORIZON]);
        }
        forecast
    }

    pub fn insert(&mut self, product: &str, units: [u32; HORIZON]) {
        self.units.insert(product.to_string(), units);
    }

    /// Adds `product` with [`PLACEHOLDER_FORECAST`] unless it already has a forecast.
    pub fn with_placeholder(mut self, product: &str) -> Self {
        self.units
            .entry(product.to_string())
            .or_insert(PLACEHOLDER_FORECAST);
        self
    }

    pub fn get(&self, product: &str) -> Option<&[u32; HORIZON]> {
        self.units.get(product)
    }

    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32; HORIZON])> {
        self.units.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Per-day multipliers applied to unit sales before aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalFactors([f64; HORIZON]);

impl Default for SeasonalFactors {
    fn default() -> Self {
        Self([1.0; HORIZON])
    }
}

impl SeasonalFactors {
    pub fn new(factors: [f64; HORIZON]) -> Result<Self, ConfigurationError> {
        if let Some(&bad) = factors.iter().find(|f| !f.is_finite() || **f < 0.0) {
            return Err(ConfigurationError::InvalidFactor {
                what: "seasonal",
                value: bad,
            });
        }
        Ok(Self(factors))
    }

    pub fn from_slice(factors: &[f64]) -> Result<Self, ConfigurationError> {
        let days: [f64; HORIZON] =
            factors
                .try_into()
                .map_err(|_| ConfigurationError::ShapeMismatch {
                    what: "seasonal factors",
                    expected: HORIZON,
                    found: factors.len(),
                })?;
        Self::new(days)
    }

    /// Adjusted copy of `sales`; each count is `trunc(units × factor)`.
    pub fn apply(&self, sales: &SalesForecast) -> SalesForecast {
        let mut adjusted = SalesForecast::new();
        for (product, units) in sales.iter() {
            let mut scaled = [0u32; HORIZON];
            for (day, u) in units.iter().enumerate() {
                scaled[day] = (*u as f64 * self.0[day]).trunc() as u32;
            }
            adjusted.insert(product, scaled);
        }
        adjusted
    }
}

/// kg of every catalog ingredient needed per day to serve `sales`. Products without a
/// recipe in the catalog consume nothing.
pub fn aggregate_demand(sales: &SalesForecast, catalog: &Catalog) -> DayTable {
    let mut demand = DayTable::zeros(catalog.ingredient_names());

    for (product, units) in sales.iter() {
        let Some(recipe) = catalog.product(product).map(|p| &p.recipe) else {
            debug!("no recipe for {:?}; its sales consume no ingredients", product);
            continue;
        };
        for (i, kg) in recipe.iter().enumerate().take(demand.num_rows()) {
            if *kg == 0.0 {
                continue;
            }
            for (day, u) in units.iter().enumerate() {
                demand.set(i, day, demand.get(i, day) + *u as f64 * kg);
            }
        }
    }
    demand
}
