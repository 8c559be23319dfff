use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::calendar::OrderingCalendar;
use crate::error::ConfigurationError;

pub const DEFAULT_TIME_LIMIT_SECS: f64 = 20.0;

fn default_time_limit() -> f64 {
    DEFAULT_TIME_LIMIT_SECS
}

/// Optional business rules for one planning run, keyed by ingredient name.
///
/// Every field but the time limit may be left out. Unknown fields are rejected so a typo
/// in a policy document does not silently disable a rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyOptions {
    /// Shelf life in days.
    #[serde(default)]
    pub expiry_limits: Option<BTreeMap<String, u32>>,
    /// Smallest order (kg) allowed on a day that orders at all.
    #[serde(default)]
    pub min_order_quantities: Option<BTreeMap<String, f64>>,
    /// Penalty per kg of unmet demand. Only listed ingredients may stock out.
    #[serde(default)]
    pub stockout_costs: Option<BTreeMap<String, f64>>,
    /// Replaces the default no-order days when present.
    #[serde(default)]
    pub allowed_ordering_days: Option<BTreeSet<usize>>,
    /// Seconds.
    #[serde(default = "default_time_limit")]
    pub solver_time_limit: f64,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            expiry_limits: None,
            min_order_quantities: None,
            stockout_costs: None,
            allowed_ordering_days: None,
            solver_time_limit: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}

impl PolicyOptions {
    pub fn from_json(doc: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(doc)
    }

    pub fn with_expiry_limit(mut self, ingredient: &str, days: u32) -> Self {
        self.expiry_limits
            .get_or_insert_with(BTreeMap::new)
            .insert(ingredient.to_string(), days);
        self
    }

    pub fn with_min_order(mut self, ingredient: &str, quantity: f64) -> Self {
        self.min_order_quantities
            .get_or_insert_with(BTreeMap::new)
            .insert(ingredient.to_string(), quantity);
        self
    }

    pub fn with_stockout_cost(mut self, ingredient: &str, cost: f64) -> Self {
        self.stockout_costs
            .get_or_insert_with(BTreeMap::new)
            .insert(ingredient.to_string(), cost);
        self
    }

    pub fn with_allowed_days<I: IntoIterator<Item = usize>>(mut self, days: I) -> Self {
        self.allowed_ordering_days = Some(days.into_iter().collect());
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.solver_time_limit = seconds;
        self
    }

    /// Checks every rule and lays it out in `labels` order.
    pub fn resolve(&self, labels: &[String]) -> Result<ResolvedPolicy, ConfigurationError> {
        let limit = self.solver_time_limit;
        let time_limit = Duration::try_from_secs_f64(limit)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(ConfigurationError::InvalidTimeLimit(limit))?;

        let calendar = match &self.allowed_ordering_days {
            Some(days) => OrderingCalendar::from_allowed_days(days)?,
            None => OrderingCalendar::default(),
        };

        let shelf_life = per_ingredient(labels, &self.expiry_limits, |name, days| {
            if days == 0 {
                Err(ConfigurationError::ZeroShelfLife(name.to_string()))
            } else {
                Ok(days as usize)
            }
        })?;

        let min_lot = per_ingredient(labels, &self.min_order_quantities, |name, quantity| {
            if quantity.is_finite() && quantity >= 0.0 {
                Ok(quantity)
            } else {
                Err(ConfigurationError::InvalidMinimumOrder {
                    ingredient: name.to_string(),
                    quantity,
                })
            }
        })?
        .into_iter()
        //a zero lot is no rule at all
        .map(|lot| lot.filter(|q| *q > 0.0))
        .collect();

        let stockout_cost = per_ingredient(labels, &self.stockout_costs, |name, cost| {
            if cost.is_finite() && cost >= 0.0 {
                Ok(cost)
            } else {
                Err(ConfigurationError::InvalidStockoutCost {
                    ingredient: name.to_string(),
                    cost,
                })
            }
        })?;

        Ok(ResolvedPolicy {
            calendar,
            shelf_life,
            min_lot,
            stockout_cost,
            time_limit,
        })
    }
}

fn per_ingredient<V: Copy, T>(
    labels: &[String],
    entries: &Option<BTreeMap<String, V>>,
    check: impl Fn(&str, V) -> Result<T, ConfigurationError>,
) -> Result<Vec<Option<T>>, ConfigurationError> {
    let mut resolved: Vec<Option<T>> = labels.iter().map(|_| None).collect();
    let Some(entries) = entries else {
        return Ok(resolved);
    };
    for (name, value) in entries {
        let i = labels
            .iter()
            .position(|l| l == name)
            .ok_or_else(|| ConfigurationError::UnknownIngredient(name.clone()))?;
        resolved[i] = Some(check(name, *value)?);
    }
    Ok(resolved)
}

/// Validated [`PolicyOptions`], indexed like the demand table rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPolicy {
    pub calendar: OrderingCalendar,
    pub shelf_life: Vec<Option<usize>>,
    pub min_lot: Vec<Option<f64>>,
    pub stockout_cost: Vec<Option<f64>>,
    pub time_limit: Duration,
}

impl ResolvedPolicy {
    pub fn allows_stockout(&self) -> bool {
        self.stockout_cost.iter().any(Option::is_some)
    }
}
