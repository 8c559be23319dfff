//! Solver invocation and result extraction.

use colored::*;
use log::warn;

use std::fmt;

use crate::calendar::HORIZON;
use crate::engine::MicroLpEngine;
use crate::error::ConfigurationError;
use crate::planner::{PlanModel, PlanModelBuilder, PlanningInputs};
use crate::policy::PolicyOptions;
use crate::solver::{Solution, SolveEngine, SolveSolution, SolveStatus, Solver};
use crate::table::DayTable;
use crate::var::Variable;

/// Values closer to zero than this are reported as exactly zero.
pub const ZERO_TOL: f64 = 1e-6;

/// Outcome of one planning run. Tables are present for `Optimal`, and for
/// `TimeLimitReached` when the engine had a feasible incumbent (a best-effort plan).
#[derive(Clone, Debug, PartialEq)]
pub struct PlanResult {
    pub status: SolveStatus,
    pub total_cost: Option<f64>,
    pub orders: Option<DayTable>,
    pub inventory: Option<DayTable>,
    /// Only when some ingredient may stock out.
    pub stockouts: Option<DayTable>,
}

impl PlanResult {
    fn status_only(status: SolveStatus) -> Self {
        Self {
            status,
            total_cost: None,
            orders: None,
            inventory: None,
            stockouts: None,
        }
    }

    fn extract(plan: &PlanModel, labels: &[String], status: SolveStatus, sol: &Solution) -> Self {
        let read = |vars: &ndarray::Array2<Variable>| {
            let mut table = DayTable::zeros(labels.to_vec());
            for ((i, d), var) in vars.indexed_iter() {
                table.set(i, d, snap(sol.var_value(var)));
            }
            table
        };

        let stockouts = plan.vars.has_stockouts().then(|| {
            let mut table = DayTable::zeros(labels.to_vec());
            for ((i, d), var) in plan.vars.stockouts.indexed_iter() {
                if let Some(var) = var {
                    table.set(i, d, snap(sol.var_value(var)));
                }
            }
            table
        });

        Self {
            status,
            total_cost: Some(sol.objective()),
            orders: Some(read(&plan.vars.orders)),
            inventory: Some(read(&plan.vars.inventory)),
            stockouts,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// A plan the engine could not prove optimal before its time limit.
    pub fn is_best_effort(&self) -> bool {
        self.status == SolveStatus::TimeLimitReached && self.orders.is_some()
    }

    pub fn has_plan(&self) -> bool {
        self.orders.is_some()
    }

    /// Cost if, and only if, the plan is optimal.
    pub fn optimal_cost(&self) -> Option<f64> {
        self.total_cost.filter(|_| self.is_optimal())
    }
}

fn snap(value: f64) -> f64 {
    if value.abs() < ZERO_TOL {
        0.0
    } else {
        value
    }
}

impl fmt::Display for PlanResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = match self.status {
            SolveStatus::Optimal => self.status.to_string().green().bold(),
            SolveStatus::TimeLimitReached if self.has_plan() => {
                format!("{} (best effort, not proven optimal)", self.status)
                    .yellow()
                    .bold()
            }
            _ => self.status.to_string().red().bold(),
        };
        writeln!(f, "Status: {}", status)?;

        if let Some(cost) = self.total_cost {
            writeln!(f, "Total cost: {:.2}", cost)?;
        }
        if let Some(orders) = &self.orders {
            writeln!(f, "\n{}", "Orders (kg)".bold())?;
            write!(f, "{}", orders)?;
        }
        if let Some(inventory) = &self.inventory {
            writeln!(f, "\n{}", "End-of-day inventory (kg)".bold())?;
            write!(f, "{}", inventory)?;
        }
        if let Some(stockouts) = &self.stockouts {
            writeln!(f, "\n{}", "Stockouts (kg)".bold())?;
            write!(f, "{}", stockouts)?;
        }
        Ok(())
    }
}

/// Builds and solves the ordering plan with the default engine.
pub fn solve_plan(
    inputs: &PlanningInputs,
    options: &PolicyOptions,
) -> Result<PlanResult, ConfigurationError> {
    solve_plan_with(&MicroLpEngine::default(), inputs, options)
}

pub fn solve_plan_with<E: SolveEngine>(
    engine: &E,
    inputs: &PlanningInputs,
    options: &PolicyOptions,
) -> Result<PlanResult, ConfigurationError> {
    let policy = options.resolve(inputs.labels())?;
    let plan = PlanModelBuilder::new(inputs, &policy).build();
    let outcome = Solver::new(engine, policy.time_limit).solve(&plan.model);

    let result = match (outcome.status, &outcome.solution) {
        (SolveStatus::Optimal, Some(sol)) | (SolveStatus::TimeLimitReached, Some(sol)) => {
            PlanResult::extract(&plan, inputs.labels(), outcome.status, sol)
        }
        (SolveStatus::Optimal, None) => {
            warn!("engine reported optimal without a solution");
            PlanResult::status_only(SolveStatus::Undetermined)
        }
        (status, _) => PlanResult::status_only(status),
    };
    debug_assert!(result
        .orders
        .as_ref()
        .map_or(true, |t| t.values().dim() == (inputs.num_ingredients(), HORIZON)));
    Ok(result)
}
