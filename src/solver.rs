use crate::affine_expr::AffineExpression;
use crate::model::Model;
use crate::var::Variable;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimitReached,
    Undetermined,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Unbounded => write!(f, "Unbounded"),
            SolveStatus::TimeLimitReached => write!(f, "TimeLimitReached"),
            SolveStatus::Undetermined => write!(f, "Undetermined"),
        }
    }
}

/// Adapter over an LP/MIP engine. Implementations must honour `time_limit` and answer
/// with [`SolveStatus::TimeLimitReached`] rather than blocking past it.
pub trait SolveEngine {
    fn solve(&self, mdl: &Model, time_limit: Duration) -> SolveOutcome;
}

impl<T: SolveEngine + ?Sized> SolveEngine for &T {
    fn solve(&self, mdl: &Model, time_limit: Duration) -> SolveOutcome {
        (**self).solve(mdl, time_limit)
    }
}

pub trait SolveSolution {
    fn var_value(&self, variable: &Variable) -> f64;

    fn expr_value(&self, expr: &AffineExpression) -> f64;
}

#[derive(Clone, Debug)]
pub struct Solution {
    obj_fn_val: f64,
    var_values: FxHashMap<Variable, f64>,
}

impl Solution {
    pub fn new(obj_fn_val: f64, var_values: FxHashMap<Variable, f64>) -> Self {
        Self {
            obj_fn_val,
            var_values,
        }
    }

    pub fn objective(&self) -> f64 {
        self.obj_fn_val
    }
}

impl SolveSolution for Solution {
    fn var_value(&self, var: &Variable) -> f64 {
        self.var_values.get(var).copied().unwrap_or(0.0)
    }

    fn expr_value(&self, expr: &AffineExpression) -> f64 {
        expr.eval(&self.var_values)
    }
}

/// What an engine reports. `solution` is present for `Optimal`, and for `TimeLimitReached`
/// when the engine holds a feasible incumbent.
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub solution: Option<Solution>,
}

impl SolveOutcome {
    pub fn optimal(solution: Solution) -> Self {
        Self {
            status: SolveStatus::Optimal,
            solution: Some(solution),
        }
    }

    pub fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            solution: None,
        }
    }

    pub fn time_limit(incumbent: Option<Solution>) -> Self {
        Self {
            status: SolveStatus::TimeLimitReached,
            solution: incumbent,
        }
    }
}

pub struct Solver<T: SolveEngine> {
    solve_algo: T,
    time_limit: Duration,
}

impl<T: SolveEngine> Solver<T> {
    pub fn new(solve_algo: T, time_limit: Duration) -> Self {
        Self {
            solve_algo,
            time_limit,
        }
    }

    pub fn solve(&self, mdl: &Model) -> SolveOutcome {
        debug!(
            "dispatching model: {} variables ({} binary), {} constraints, budget {:?}",
            mdl.env().len(),
            mdl.num_binaries(),
            mdl.constraints().len(),
            self.time_limit
        );
        let start = Instant::now();
        let outcome = self.solve_algo.solve(mdl, self.time_limit);
        let elapsed = start.elapsed();

        match (&outcome.status, &outcome.solution) {
            (SolveStatus::Optimal, Some(sol)) => {
                info!("optimal objective {:.4} after {:?}", sol.objective(), elapsed)
            }
            (SolveStatus::TimeLimitReached, Some(sol)) => warn!(
                "time limit {:?} reached; best incumbent objective {:.4}",
                self.time_limit,
                sol.objective()
            ),
            (status, _) => warn!("solve ended with status {} after {:?}", status, elapsed),
        }
        outcome
    }
}
