//! Weekly ingredient ordering and inventory planning.
//!
//! Sales forecasts are turned into ingredient demand, priced with a day-specific discount
//! and planned as a linear program (a mixed-integer one when minimum lots are set). The
//! program is written into a small engine-neutral modeling layer ([`model`]) and solved
//! through a [`solver::SolveEngine`], by default [`engine::MicroLpEngine`].

pub mod affine_expr;
pub mod calendar;
pub mod catalog;
pub mod constraint;
pub mod demand;
pub mod engine;
pub mod error;
pub mod model;
pub mod plan;
pub mod planner;
pub mod policy;
pub mod pricing;
pub mod sensitivity;
pub mod solver;
pub mod table;
pub mod var;

pub use catalog::{Catalog, Ingredient, Product};
pub use demand::{aggregate_demand, SalesForecast, SeasonalFactors};
pub use error::ConfigurationError;
pub use plan::{solve_plan, solve_plan_with, PlanResult};
pub use planner::{PlanModelBuilder, PlanningInputs};
pub use policy::PolicyOptions;
pub use pricing::{build_cost_schedule, CostParameters, DiscountRule};
pub use sensitivity::{run_sensitivity, SensitivityParameter, SensitivityPoint};
pub use solver::SolveStatus;
pub use table::DayTable;
