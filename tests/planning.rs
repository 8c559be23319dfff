use ntest::timeout;
use order_planner::calendar::HORIZON;
use order_planner::{
    aggregate_demand, run_sensitivity, solve_plan, Catalog, CostParameters, DayTable,
    DiscountRule, PlanResult, PlanningInputs, PolicyOptions, SalesForecast,
    SensitivityParameter, SolveStatus,
};

use ndarray::Array2;
use std::collections::BTreeMap;

const TOL: f64 = 1e-5;

fn costs(catalog: &Catalog, rate: f64) -> CostParameters {
    CostParameters::from_catalog(catalog, DiscountRule::with_rate(rate).unwrap())
}

fn flat_inputs(units: u32, rate: f64) -> PlanningInputs {
    let catalog = Catalog::coffee_shop();
    let demand = aggregate_demand(&SalesForecast::flat(&catalog, units), &catalog);
    PlanningInputs::from_costs(demand, &costs(&catalog, rate)).unwrap()
}

fn assert_balanced(inputs: &PlanningInputs, result: &PlanResult) {
    let orders = result.orders.as_ref().unwrap();
    let inventory = result.inventory.as_ref().unwrap();
    for i in 0..inputs.num_ingredients() {
        for d in 0..HORIZON {
            let carried = if d == 0 { 0.0 } else { inventory.get(i, d - 1) };
            let stockout = result.stockouts.as_ref().map_or(0.0, |t| t.get(i, d));
            let expected = carried + orders.get(i, d) - inputs.demand().get(i, d) + stockout;
            assert!(
                (inventory.get(i, d) - expected).abs() < TOL,
                "balance broken for {} on day {}",
                inputs.labels()[i],
                d
            );
        }
    }
}

#[test]
#[timeout(60000)]
fn flat_week_end_to_end() {
    let inputs = flat_inputs(50, 0.15);
    let result = solve_plan(&inputs, &PolicyOptions::default()).unwrap();

    assert_eq!(result.status, SolveStatus::Optimal);
    assert!(result.total_cost.unwrap() > 0.0);

    let orders = result.orders.as_ref().unwrap();
    for i in 0..inputs.num_ingredients() {
        assert_eq!(orders.get(i, 1), 0.0);
        assert_eq!(orders.get(i, 4), 0.0);
    }
    assert_balanced(&inputs, &result);
}

#[test]
#[timeout(60000)]
fn predicted_week_keeps_balance() {
    let catalog = Catalog::coffee_shop();
    let demand = aggregate_demand(&SalesForecast::coffee_shop_prediction(), &catalog);
    let inputs = PlanningInputs::from_costs(demand, &costs(&catalog, 0.15)).unwrap();

    let result = solve_plan(&inputs, &PolicyOptions::default()).unwrap();
    assert!(result.is_optimal());
    assert_balanced(&inputs, &result);
    let inventory = result.inventory.as_ref().unwrap();
    assert!(inventory.values().iter().all(|v| *v >= 0.0));
}

#[test]
#[timeout(60000)]
fn zero_demand_orders_nothing() {
    let catalog = Catalog::coffee_shop();
    let demand = DayTable::zeros(catalog.ingredient_names());
    let inputs = PlanningInputs::from_costs(demand, &costs(&catalog, 0.15)).unwrap();

    let result = solve_plan(&inputs, &PolicyOptions::default()).unwrap();
    assert!(result.is_optimal());
    assert!(result.total_cost.unwrap().abs() < 1e-9);
    assert_eq!(result.orders.unwrap().total(), 0.0);
    assert_eq!(result.inventory.unwrap().total(), 0.0);
}

#[test]
#[timeout(60000)]
fn open_week_without_discount_orders_just_in_time() {
    let inputs = flat_inputs(50, 0.0);
    let options = PolicyOptions::default().with_allowed_days(0..HORIZON);

    let result = solve_plan(&inputs, &options).unwrap();
    assert!(result.is_optimal());
    let orders = result.orders.as_ref().unwrap();
    assert!(orders.max_abs_diff(inputs.demand()) < TOL);
    assert!(result.inventory.as_ref().unwrap().total() < TOL);
}

#[test]
#[timeout(60000)]
fn free_thursday_takes_the_rest_of_the_week() {
    let inputs = flat_inputs(50, 1.0);
    let result = solve_plan(&inputs, &PolicyOptions::default()).unwrap();
    assert!(result.is_optimal());

    let orders = result.orders.as_ref().unwrap();
    for i in 0..inputs.num_ingredients() {
        assert_eq!(inputs.prices().get(i, 3), 0.0);
        for d in 4..HORIZON {
            assert_eq!(orders.get(i, d), 0.0);
        }
        let rest_of_week = inputs.demand().window_sum(i, 3..HORIZON);
        assert!((orders.get(i, 3) - rest_of_week).abs() < TOL);
    }
}

#[test]
#[timeout(60000)]
fn zero_recipe_product_changes_nothing() {
    let catalog = Catalog::coffee_shop();
    let sales = SalesForecast::coffee_shop_prediction();
    let base_demand = aggregate_demand(&sales, &catalog);
    let base_inputs = PlanningInputs::from_costs(base_demand, &costs(&catalog, 0.15)).unwrap();
    let base = solve_plan(&base_inputs, &PolicyOptions::default()).unwrap();

    let water: BTreeMap<String, f64> = catalog
        .ingredient_names()
        .into_iter()
        .map(|n| (n, 0.0))
        .collect();
    let extended = catalog.add_product("Water", &water).unwrap();
    let sales = sales.with_placeholder("Water");
    let demand = aggregate_demand(&sales, &extended);
    let inputs = PlanningInputs::from_costs(demand, &costs(&extended, 0.15)).unwrap();
    let with_water = solve_plan(&inputs, &PolicyOptions::default()).unwrap();

    assert!(with_water.is_optimal());
    assert!((base.total_cost.unwrap() - with_water.total_cost.unwrap()).abs() < 1e-6);
    assert!(
        base.orders
            .unwrap()
            .max_abs_diff(with_water.orders.as_ref().unwrap())
            < TOL
    );
}

#[test]
#[timeout(60000)]
fn minimum_lot_is_never_undercut() {
    //chocolate powder needs 5.25 kg over the flat week
    let inputs = flat_inputs(50, 0.15);
    let chocolate = inputs.demand().row_index("Chocolate Powder").unwrap();
    let options = PolicyOptions::default().with_min_order("Chocolate Powder", 10.0);

    let result = solve_plan(&inputs, &options).unwrap();
    assert!(result.is_optimal());
    let orders = result.orders.as_ref().unwrap();
    let placed: Vec<f64> = orders.row(chocolate).iter().copied().filter(|q| *q > 0.0).collect();

    assert!(!placed.is_empty());
    assert!(placed.iter().all(|q| *q >= 10.0 - TOL));
    assert_balanced(&inputs, &result);
}

#[test]
#[timeout(60000)]
fn cheap_stockout_beats_a_large_lot() {
    let inputs = flat_inputs(50, 0.15);
    let chocolate = inputs.demand().row_index("Chocolate Powder").unwrap();
    let options = PolicyOptions::default()
        .with_min_order("Chocolate Powder", 10.0)
        .with_stockout_cost("Chocolate Powder", 1.0);

    let result = solve_plan(&inputs, &options).unwrap();
    assert!(result.is_optimal());
    assert_eq!(result.orders.as_ref().unwrap().window_sum(chocolate, 0..HORIZON), 0.0);

    let stockouts = result.stockouts.as_ref().unwrap();
    let weekly = inputs.demand().window_sum(chocolate, 0..HORIZON);
    assert!((stockouts.window_sum(chocolate, 0..HORIZON) - weekly).abs() < TOL);
    assert_balanced(&inputs, &result);
}

#[test]
#[timeout(60000)]
fn one_day_shelf_life_needs_stockouts() {
    let inputs = flat_inputs(50, 0.15);
    let strict = PolicyOptions::default().with_expiry_limit("Steamed Milk", 1);

    let result = solve_plan(&inputs, &strict).unwrap();
    assert_eq!(result.status, SolveStatus::Infeasible);
    assert!(!result.has_plan());

    let relaxed = strict.with_stockout_cost("Steamed Milk", 50.0);
    let result = solve_plan(&inputs, &relaxed).unwrap();
    assert!(result.is_optimal());

    let milk = inputs.demand().row_index("Steamed Milk").unwrap();
    let orders = result.orders.as_ref().unwrap();
    assert_eq!(orders.get(milk, 1), 0.0);
    assert_eq!(orders.get(milk, 4), 0.0);
    //the window bound only tracks totals, so some but not all closed-day demand goes unmet
    let stockouts = result.stockouts.as_ref().unwrap();
    assert!(stockouts.window_sum(milk, 0..HORIZON) > TOL);
    assert_balanced(&inputs, &result);
}

#[test]
#[timeout(60000)]
fn negative_price_is_unbounded() {
    let catalog = Catalog::coffee_shop();
    let demand = aggregate_demand(&SalesForecast::flat(&catalog, 10), &catalog);
    let mut prices = Array2::from_elem((catalog.ingredients().len(), HORIZON), 5.0);
    prices[[0, 0]] = -100.0;
    let prices = DayTable::new(catalog.ingredient_names(), prices).unwrap();
    let inputs = PlanningInputs::new(demand, prices, catalog.holding_costs()).unwrap();

    let result = solve_plan(&inputs, &PolicyOptions::default()).unwrap();
    assert_eq!(result.status, SolveStatus::Unbounded);
    assert!(result.total_cost.is_none());
}

#[test]
fn negative_demand_is_rejected_before_modeling() {
    let catalog = Catalog::coffee_shop();
    let mut demand = aggregate_demand(&SalesForecast::flat(&catalog, 10), &catalog);
    demand.set(0, 3, -1.0);

    let inputs = PlanningInputs::from_costs(demand, &costs(&catalog, 0.15));
    assert!(inputs.is_err());
}

#[test]
#[timeout(120000)]
fn demand_sweep_is_monotonic() {
    let catalog = Catalog::coffee_shop();
    let demand = aggregate_demand(&SalesForecast::flat(&catalog, 50), &catalog);
    let base_costs = costs(&catalog, 0.15);
    let parameter = SensitivityParameter::DemandFactor;

    let points = run_sensitivity(
        &demand,
        &base_costs,
        parameter,
        &parameter.default_candidates(),
        &PolicyOptions::default(),
    )
    .unwrap();

    let sweep: Vec<f64> = points.iter().map(|p| p.total_cost.unwrap()).collect();
    assert_eq!(sweep.len(), 6);
    assert!(sweep.windows(2).all(|w| w[1] >= w[0] - 1e-6));
    //the base table is not scaled in place
    let fresh = aggregate_demand(&SalesForecast::flat(&catalog, 50), &catalog);
    assert_eq!(demand, fresh);
}
