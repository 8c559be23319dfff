//! Sensitivity driver: re-solves the whole plan while sweeping one parameter.

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::engine::MicroLpEngine;
use crate::error::ConfigurationError;
use crate::plan::solve_plan_with;
use crate::planner::PlanningInputs;
use crate::policy::PolicyOptions;
use crate::pricing::{check_rate, CostParameters};
use crate::solver::SolveEngine;
use crate::table::DayTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SensitivityParameter {
    /// Discount on the discount day.
    DiscountRate,
    /// Multiplier on every holding cost.
    HoldingCostFactor,
    /// Multiplier on every demand entry.
    DemandFactor,
}

impl SensitivityParameter {
    pub fn label(&self) -> &'static str {
        match self {
            SensitivityParameter::DiscountRate => "discount rate",
            SensitivityParameter::HoldingCostFactor => "holding cost factor",
            SensitivityParameter::DemandFactor => "demand factor",
        }
    }

    pub fn default_candidates(&self) -> Vec<f64> {
        match self {
            SensitivityParameter::DiscountRate => (0..=7).map(|k| k as f64 * 0.05).collect(),
            SensitivityParameter::HoldingCostFactor => {
                (0..=6).map(|k| 0.5 + k as f64 * 0.25).collect()
            }
            SensitivityParameter::DemandFactor => (0..=5).map(|k| 0.8 + k as f64 * 0.1).collect(),
        }
    }

    fn check(&self, value: f64) -> Result<f64, ConfigurationError> {
        match self {
            SensitivityParameter::DiscountRate => check_rate(value),
            _ if value.is_finite() && value >= 0.0 => Ok(value),
            _ => Err(ConfigurationError::InvalidFactor {
                what: self.label(),
                value,
            }),
        }
    }
}

impl fmt::Display for SensitivityParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One evaluated candidate. `total_cost` is `None` when the plan was not solved to
/// optimality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: f64,
    pub total_cost: Option<f64>,
}

pub fn run_sensitivity(
    base_demand: &DayTable,
    base_costs: &CostParameters,
    parameter: SensitivityParameter,
    candidates: &[f64],
    fixed: &PolicyOptions,
) -> Result<Vec<SensitivityPoint>, ConfigurationError> {
    run_sensitivity_with(
        &MicroLpEngine::default(),
        base_demand,
        base_costs,
        parameter,
        candidates,
        fixed,
    )
}

/// Evaluates every candidate in order. The base tables are only read; each candidate gets
/// its own scaled copy.
pub fn run_sensitivity_with<E: SolveEngine>(
    engine: &E,
    base_demand: &DayTable,
    base_costs: &CostParameters,
    parameter: SensitivityParameter,
    candidates: &[f64],
    fixed: &PolicyOptions,
) -> Result<Vec<SensitivityPoint>, ConfigurationError> {
    for &value in candidates {
        parameter.check(value)?;
    }
    fixed.resolve(base_demand.labels())?;

    let mut points = Vec::with_capacity(candidates.len());
    for &value in candidates {
        let mut costs = base_costs.clone();
        let demand = match parameter {
            SensitivityParameter::DiscountRate => {
                costs.discount.rate = value;
                base_demand.clone()
            }
            SensitivityParameter::HoldingCostFactor => {
                costs.holding_costs = &base_costs.holding_costs * value;
                base_demand.clone()
            }
            SensitivityParameter::DemandFactor => base_demand.scaled(value),
        };

        let inputs = PlanningInputs::from_costs(demand, &costs)?;
        let result = solve_plan_with(engine, &inputs, fixed)?;
        let total_cost = result.optimal_cost();
        match total_cost {
            Some(cost) => info!("{} = {:.3}: cost {:.2}", parameter, value, cost),
            None => warn!("{} = {:.3}: {}", parameter, value, result.status),
        }
        points.push(SensitivityPoint { value, total_cost });
    }
    Ok(points)
}
