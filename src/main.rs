use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colored::*;
use env_logger::Builder;
use tabular::{Row, Table};

use std::fs;
use std::path::PathBuf;

use order_planner::calendar::DEFAULT_DISCOUNT_DAY;
use order_planner::pricing::DEFAULT_DISCOUNT_RATE;
use order_planner::{
    aggregate_demand, run_sensitivity, solve_plan, Catalog, CostParameters, DiscountRule,
    PlanModelBuilder, PlanningInputs, PolicyOptions, SalesForecast, SeasonalFactors,
    SensitivityParameter,
};

/// Plan a week of coffee shop ingredient orders at minimum purchase and holding cost.
#[derive(Parser, Debug)]
#[command(name = "order-planner", version)]
struct Cli {
    /// Discount rate on the discount day, in [0, 1]
    #[arg(long, default_value_t = DEFAULT_DISCOUNT_RATE)]
    discount_rate: f64,

    /// Day receiving the discount (0 = Monday)
    #[arg(long, default_value_t = DEFAULT_DISCOUNT_DAY)]
    discount_day: usize,

    /// JSON policy document (expiry limits, minimum lots, stockout costs, ordering days)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Solver time limit in seconds; overrides the policy document
    #[arg(long)]
    time_limit: Option<f64>,

    /// Seven comma-separated demand multipliers, Monday first
    #[arg(long, value_delimiter = ',')]
    seasonal: Option<Vec<f64>>,

    /// Sell this many units of every product every day instead of the predicted week
    #[arg(long)]
    flat_demand: Option<u32>,

    /// Sweep one parameter over its default grid after solving
    #[arg(long, value_enum)]
    sensitivity: Option<SensitivityParameter>,

    /// Print the generated model before solving
    #[arg(long)]
    show_model: bool,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let catalog = Catalog::coffee_shop();
    let sales = match cli.flat_demand {
        Some(units) => SalesForecast::flat(&catalog, units),
        None => SalesForecast::coffee_shop_prediction(),
    };
    let sales = match &cli.seasonal {
        Some(factors) => SeasonalFactors::from_slice(factors)?.apply(&sales),
        None => sales,
    };
    let demand = aggregate_demand(&sales, &catalog);

    let mut options = match &cli.policy {
        Some(path) => {
            let doc = fs::read_to_string(path)
                .with_context(|| format!("reading policy {}", path.display()))?;
            PolicyOptions::from_json(&doc)
                .with_context(|| format!("parsing policy {}", path.display()))?
        }
        None => PolicyOptions::default(),
    };
    if let Some(limit) = cli.time_limit {
        options.solver_time_limit = limit;
    }

    let discount = DiscountRule::new(cli.discount_day, cli.discount_rate)?;
    let costs = CostParameters::from_catalog(&catalog, discount);
    let inputs = PlanningInputs::from_costs(demand.clone(), &costs)?;

    println!("{}", "Demand (kg)".bold());
    println!("{}", demand);

    if cli.show_model {
        let policy = options.resolve(inputs.labels())?;
        let plan = PlanModelBuilder::new(&inputs, &policy).build();
        println!("{}\n", plan.model);
    }

    let result = solve_plan(&inputs, &options).context("planning the week")?;
    println!("{}", result);

    if let Some(parameter) = cli.sensitivity {
        let candidates = parameter.default_candidates();
        let points = run_sensitivity(&demand, &costs, parameter, &candidates, &options)?;

        let mut table = Table::new("{:>}  {:>}");
        table.add_row(Row::new().with_cell(parameter).with_cell("total cost"));
        for point in points {
            let cost = match point.total_cost {
                Some(cost) => format!("{:.2}", cost),
                None => "-".to_string(),
            };
            table.add_row(Row::new().with_cell(format!("{:.2}", point.value)).with_cell(cost));
        }
        println!("\n{}", "Sensitivity".bold());
        print!("{}", table);
    }
    Ok(())
}
