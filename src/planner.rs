//! Ordering-plan model builder.
//!
//! The base model (orders, end-of-day inventory, inventory balance, no-order days) is
//! always present. Optional business rules are [`PolicyExtension`]s that add their own
//! variables, constraints and cost terms, and only when the resolved policy enables them
//! for at least one ingredient.

use log::{debug, info};
use ndarray::{Array1, Array2};

use crate::affine_expr::AffineExpression;
use crate::calendar::{day_name, HORIZON};
use crate::constraint::{Comp, Constraint};
use crate::error::ConfigurationError;
use crate::model::{Model, OptDir};
use crate::policy::ResolvedPolicy;
use crate::pricing::CostParameters;
use crate::table::DayTable;
use crate::var::{Environment, VarType, Variable, VariableDefinition};

/// Demand, prices and holding costs with rows in one shared ingredient order.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanningInputs {
    demand: DayTable,
    prices: DayTable,
    holding_costs: Array1<f64>,
}

impl PlanningInputs {
    /// `prices` rows are matched to `demand` rows by label; `holding_costs` must already be
    /// in demand row order.
    pub fn new(
        demand: DayTable,
        prices: DayTable,
        holding_costs: Array1<f64>,
    ) -> Result<Self, ConfigurationError> {
        let n = demand.num_rows();
        if holding_costs.len() != n {
            return Err(ConfigurationError::ShapeMismatch {
                what: "holding costs",
                expected: n,
                found: holding_costs.len(),
            });
        }
        let mut aligned = Array2::zeros((n, HORIZON));
        for (i, label) in demand.labels().iter().enumerate() {
            let row = prices
                .by_label(label)
                .ok_or_else(|| ConfigurationError::MissingRow {
                    what: "price table",
                    ingredient: label.clone(),
                })?;
            aligned.row_mut(i).assign(&row);
        }
        let prices = DayTable::new(demand.labels().to_vec(), aligned)?;

        check_entries(&demand, "demand", |v| v.is_finite() && v >= 0.0)?;
        //negative prices are left to the solver, which reports them as unbounded
        check_entries(&prices, "price", f64::is_finite)?;
        for (label, cost) in demand.labels().iter().zip(holding_costs.iter()) {
            if !cost.is_finite() {
                return Err(ConfigurationError::InvalidCost {
                    what: "holding cost",
                    ingredient: label.clone(),
                    value: *cost,
                });
            }
        }

        Ok(Self {
            demand,
            prices,
            holding_costs,
        })
    }

    /// Prices the demand with the discounted schedule of `costs`.
    pub fn from_costs(demand: DayTable, costs: &CostParameters) -> Result<Self, ConfigurationError> {
        let prices = costs.price_schedule()?;
        if costs.holding_costs.len() != costs.labels.len() {
            return Err(ConfigurationError::ShapeMismatch {
                what: "holding costs",
                expected: costs.labels.len(),
                found: costs.holding_costs.len(),
            });
        }
        let mut holding = Array1::zeros(demand.num_rows());
        for (i, label) in demand.labels().iter().enumerate() {
            let j = costs.labels.iter().position(|l| l == label).ok_or_else(|| {
                ConfigurationError::MissingRow {
                    what: "holding costs",
                    ingredient: label.clone(),
                }
            })?;
            holding[i] = costs.holding_costs[j];
        }
        Self::new(demand, prices, holding)
    }

    pub fn labels(&self) -> &[String] {
        self.demand.labels()
    }

    pub fn num_ingredients(&self) -> usize {
        self.demand.num_rows()
    }

    pub fn demand(&self) -> &DayTable {
        &self.demand
    }

    pub fn prices(&self) -> &DayTable {
        &self.prices
    }

    pub fn holding_costs(&self) -> &Array1<f64> {
        &self.holding_costs
    }
}

fn check_entries(
    table: &DayTable,
    what: &'static str,
    valid: impl Fn(f64) -> bool,
) -> Result<(), ConfigurationError> {
    for ((i, day), value) in table.values().indexed_iter() {
        if !valid(*value) {
            return Err(ConfigurationError::InvalidQuantity {
                what,
                ingredient: table.labels()[i].clone(),
                day,
                value: *value,
            });
        }
    }
    Ok(())
}

/// Decision variables of a plan model, ingredient × day.
#[derive(Clone, Debug)]
pub struct PlanVariables {
    pub orders: Array2<Variable>,
    pub inventory: Array2<Variable>,
    /// Only for ingredients allowed to stock out.
    pub stockouts: Array2<Option<Variable>>,
    /// Order/no-order indicators, only for ingredients with a minimum lot on allowed days.
    pub order_flags: Array2<Option<Variable>>,
}

impl PlanVariables {
    pub fn has_stockouts(&self) -> bool {
        self.stockouts.iter().any(Option::is_some)
    }
}

/// Shared state the extensions write into while a model is being built.
pub struct PlanContext<'a> {
    pub inputs: &'a PlanningInputs,
    pub policy: &'a ResolvedPolicy,
    pub vars: PlanVariables,
    env: Environment,
    objective: AffineExpression,
    constraints: Vec<Constraint>,
}

impl<'a> PlanContext<'a> {
    pub fn add_var(&mut self, var_def: VariableDefinition) -> Variable {
        self.env.add_var(var_def)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn add_cost(&mut self, cost: AffineExpression) {
        self.objective += cost;
    }

    fn label(&self, i: usize) -> &str {
        &self.inputs.labels()[i]
    }
}

/// An optional rule layered on top of the base model.
pub trait PolicyExtension {
    fn name(&self) -> &'static str;

    /// Adds variables. Runs before any constraint exists, so the base balance rows can see
    /// them.
    fn declare(&self, _ctx: &mut PlanContext) {}

    /// Adds constraints and cost terms once every variable exists.
    fn constrain(&self, _ctx: &mut PlanContext) {}
}

/// Unmet demand at a per-kg penalty. The stockout on a day never exceeds that day's demand.
pub struct StockoutAccounting;

impl PolicyExtension for StockoutAccounting {
    fn name(&self) -> &'static str {
        "stockout accounting"
    }

    fn declare(&self, ctx: &mut PlanContext) {
        for i in 0..ctx.inputs.num_ingredients() {
            if ctx.policy.stockout_cost[i].is_none() {
                continue;
            }
            for d in 0..HORIZON {
                let def = VariableDefinition::non_negative()
                    .with_ub(ctx.inputs.demand().get(i, d))
                    .with_name(format!("stockout[{},{}]", ctx.label(i), day_name(d)));
                let var = ctx.add_var(def);
                ctx.vars.stockouts[[i, d]] = Some(var);
            }
        }
    }

    fn constrain(&self, ctx: &mut PlanContext) {
        let mut penalty = AffineExpression::default();
        for ((i, _), var) in ctx.vars.stockouts.indexed_iter() {
            if let (Some(var), Some(cost)) = (var, ctx.policy.stockout_cost[i]) {
                penalty.add_term(var, cost);
            }
        }
        ctx.add_cost(penalty);
    }
}

/// Minimum lot: an order is either zero or at least the lot. Linked through a binary
/// indicator and a big-M bound of weekly demand plus the lot.
pub struct MinimumLot;

impl PolicyExtension for MinimumLot {
    fn name(&self) -> &'static str {
        "minimum lot"
    }

    fn declare(&self, ctx: &mut PlanContext) {
        for i in 0..ctx.inputs.num_ingredients() {
            if ctx.policy.min_lot[i].is_none() {
                continue;
            }
            for d in ctx.policy.calendar.allowed_days() {
                let def = VariableDefinition::new(VarType::Binary)
                    .with_name(format!("ordering[{},{}]", ctx.label(i), day_name(d)));
                let var = ctx.add_var(def);
                ctx.vars.order_flags[[i, d]] = Some(var);
            }
        }
    }

    fn constrain(&self, ctx: &mut PlanContext) {
        for i in 0..ctx.inputs.num_ingredients() {
            let Some(lot) = ctx.policy.min_lot[i] else {
                continue;
            };
            let big_m = ctx.inputs.demand().row(i).sum() + lot;
            for d in 0..HORIZON {
                let Some(flag) = ctx.vars.order_flags[[i, d]].clone() else {
                    continue;
                };
                let order = ctx.vars.orders[[i, d]].clone();
                let at = format!("{},{}", ctx.label(i), day_name(d));

                ctx.add_constraint(
                    Constraint::new(&order, Comp::Le, big_m * &flag)
                        .with_name(format!("lot_link[{}]", at)),
                );
                ctx.add_constraint(
                    Constraint::new(&order, Comp::Ge, lot * &flag)
                        .with_name(format!("lot_min[{}]", at)),
                );
            }
        }
    }
}

/// Shelf life as a window bound: orders placed inside any window of `shelf life` days may
/// not exceed the demand of that window plus the stock carried into it. Tracks totals, not
/// batch ages.
pub struct ShelfLife;

impl PolicyExtension for ShelfLife {
    fn name(&self) -> &'static str {
        "shelf life"
    }

    fn constrain(&self, ctx: &mut PlanContext) {
        for i in 0..ctx.inputs.num_ingredients() {
            let Some(life) = ctx.policy.shelf_life[i] else {
                continue;
            };
            if life >= HORIZON {
                debug!("shelf life of {} covers the whole week", ctx.label(i));
                continue;
            }
            for start in 0..=HORIZON - life {
                let window = start..start + life;
                let ordered: AffineExpression =
                    window.clone().map(|d| &ctx.vars.orders[[i, d]]).sum();
                let mut usable = AffineExpression::from(ctx.inputs.demand().window_sum(i, window));
                if start > 0 {
                    usable += &ctx.vars.inventory[[i, start - 1]];
                }
                let name = format!(
                    "expiry[{},{}..{}]",
                    ctx.label(i),
                    day_name(start),
                    day_name(start + life - 1)
                );
                ctx.add_constraint(Constraint::new(ordered, Comp::Le, usable).with_name(name));
            }
        }
    }
}

/// A built model and handles to its decision variables.
pub struct PlanModel {
    pub model: Model,
    pub vars: PlanVariables,
}

pub struct PlanModelBuilder<'a> {
    inputs: &'a PlanningInputs,
    policy: &'a ResolvedPolicy,
    extensions: Vec<Box<dyn PolicyExtension>>,
}

impl<'a> PlanModelBuilder<'a> {
    /// Builder with the stockout, minimum-lot and shelf-life extensions registered.
    pub fn new(inputs: &'a PlanningInputs, policy: &'a ResolvedPolicy) -> Self {
        Self {
            inputs,
            policy,
            extensions: vec![
                Box::new(StockoutAccounting),
                Box::new(MinimumLot),
                Box::new(ShelfLife),
            ],
        }
    }

    pub fn with_extension(mut self, extension: Box<dyn PolicyExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn build(&self) -> PlanModel {
        let n = self.inputs.num_ingredients();
        let labels = self.inputs.labels();
        let mut env = Environment::new();

        let orders = Array2::from_shape_fn((n, HORIZON), |(i, d)| {
            env.add_var(
                VariableDefinition::non_negative()
                    .with_name(format!("order[{},{}]", labels[i], day_name(d))),
            )
        });
        let inventory = Array2::from_shape_fn((n, HORIZON), |(i, d)| {
            env.add_var(
                VariableDefinition::non_negative()
                    .with_name(format!("inventory[{},{}]", labels[i], day_name(d))),
            )
        });

        let mut ctx = PlanContext {
            inputs: self.inputs,
            policy: self.policy,
            vars: PlanVariables {
                orders,
                inventory,
                stockouts: Array2::from_elem((n, HORIZON), None),
                order_flags: Array2::from_elem((n, HORIZON), None),
            },
            env,
            objective: AffineExpression::default(),
            constraints: Vec::new(),
        };

        for ext in &self.extensions {
            ext.declare(&mut ctx);
        }

        let base_cost = self.base_cost(&ctx.vars);
        ctx.add_cost(base_cost);
        self.add_balance(&mut ctx);
        self.add_no_order_days(&mut ctx);

        for ext in &self.extensions {
            let before = ctx.constraints.len();
            ext.constrain(&mut ctx);
            debug!("{}: {} constraints", ext.name(), ctx.constraints.len() - before);
        }

        let PlanContext {
            vars,
            env,
            objective,
            constraints,
            ..
        } = ctx;
        let mut model = Model::new(env);
        model.set_obj_fn(OptDir::Min, objective);
        for constraint in constraints {
            model.add_constraint(constraint);
        }
        info!(
            "built plan model: {} variables ({} binary), {} constraints",
            model.env().len(),
            model.num_binaries(),
            model.constraints().len()
        );
        PlanModel { model, vars }
    }

    /// Purchase plus holding cost.
    fn base_cost(&self, vars: &PlanVariables) -> AffineExpression {
        let mut cost = AffineExpression::default();
        for ((i, d), order) in vars.orders.indexed_iter() {
            cost.add_term(order, self.inputs.prices().get(i, d));
            cost.add_term(&vars.inventory[[i, d]], self.inputs.holding_costs()[i]);
        }
        cost
    }

    /// inventory[d] = inventory[d-1] + order[d] - demand[d] (+ stockout[d])
    fn add_balance(&self, ctx: &mut PlanContext) {
        for i in 0..self.inputs.num_ingredients() {
            for d in 0..HORIZON {
                let vars = &ctx.vars;
                let mut supply =
                    AffineExpression::from(&vars.orders[[i, d]]) - self.inputs.demand().get(i, d);
                if d > 0 {
                    supply += &vars.inventory[[i, d - 1]];
                }
                if let Some(stockout) = &vars.stockouts[[i, d]] {
                    supply += stockout;
                }
                let balance = Constraint::new(&vars.inventory[[i, d]], Comp::Eq, supply)
                    .with_name(format!("balance[{},{}]", ctx.label(i), day_name(d)));
                ctx.add_constraint(balance);
            }
        }
    }

    fn add_no_order_days(&self, ctx: &mut PlanContext) {
        for d in ctx.policy.calendar.no_order_days() {
            for i in 0..self.inputs.num_ingredients() {
                let closed = Constraint::new(&ctx.vars.orders[[i, d]], Comp::Eq, 0.0)
                    .with_name(format!("no_order[{},{}]", ctx.label(i), day_name(d)));
                ctx.add_constraint(closed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyOptions;

    fn inputs(weekly: f64) -> PlanningInputs {
        let labels: Vec<String> = vec!["Beans".to_string(), "Milk".to_string()];
        let demand = DayTable::new(labels.clone(), Array2::from_elem((2, HORIZON), weekly / 7.0)).unwrap();
        let prices = DayTable::new(labels, Array2::from_elem((2, HORIZON), 10.0)).unwrap();
        PlanningInputs::new(demand, prices, Array1::from(vec![1.0, 0.5])).unwrap()
    }

    fn build(options: PolicyOptions) -> PlanModel {
        let inputs = inputs(14.0);
        let policy = options.resolve(inputs.labels()).unwrap();
        PlanModelBuilder::new(&inputs, &policy).build()
    }

    #[test]
    fn base_model_shape() {
        let plan = build(PolicyOptions::default());

        //orders + inventory
        assert_eq!(plan.model.env().len(), 2 * 2 * HORIZON);
        assert_eq!(plan.model.num_binaries(), 0);
        assert_eq!(plan.model.constraints_named("balance[").count(), 2 * HORIZON);
        //two default no-order days per ingredient
        assert_eq!(plan.model.constraints_named("no_order[").count(), 4);
        assert!(plan
            .model
            .constraints_named("no_order[")
            .any(|c| c.name() == "no_order[Milk,Fri]"));
        assert!(!plan.vars.has_stockouts());
    }

    #[test]
    fn zero_or_unset_lot_adds_no_binaries() {
        let plan = build(PolicyOptions::default().with_min_order("Beans", 0.0));
        assert_eq!(plan.model.num_binaries(), 0);
        assert_eq!(plan.model.constraints_named("lot_").count(), 0);
    }

    #[test]
    fn lot_indicators_only_on_allowed_days() {
        let plan = build(PolicyOptions::default().with_min_order("Beans", 3.0));

        //five allowed days, one ingredient
        assert_eq!(plan.model.num_binaries(), 5);
        assert_eq!(plan.model.constraints_named("lot_link[").count(), 5);
        assert_eq!(plan.model.constraints_named("lot_min[").count(), 5);
        assert!(plan.vars.order_flags[[0, 1]].is_none());
        assert!(plan.vars.order_flags[[1, 0]].is_none());

        //big-M is weekly demand plus the lot
        let link = plan
            .model
            .constraints_named("lot_link[Beans,Mon]")
            .next()
            .unwrap();
        let flag = plan.vars.order_flags[[0, 0]].clone().unwrap();
        assert!((link.rhs().coeff(&flag) - 17.0).abs() < 1e-9);
    }

    #[test]
    fn long_shelf_life_adds_nothing() {
        let plan = build(
            PolicyOptions::default()
                .with_expiry_limit("Beans", 7)
                .with_expiry_limit("Milk", 30),
        );
        assert_eq!(plan.model.constraints_named("expiry[").count(), 0);
    }

    #[test]
    fn shelf_life_windows() {
        let plan = build(PolicyOptions::default().with_expiry_limit("Milk", 3));
        let windows: Vec<&Constraint> = plan.model.constraints_named("expiry[").collect();

        //starts Mon..Fri
        assert_eq!(windows.len(), 5);
        assert_eq!(windows[0].name(), "expiry[Milk,Mon..Wed]");
        //first window has no carried-in stock
        assert!(windows[0].rhs().is_constant());
        assert!((windows[0].rhs().constant() - 6.0).abs() < 1e-9);
        assert!(windows[1].rhs().contains_var(&plan.vars.inventory[[1, 0]]));
    }

    #[test]
    fn stockouts_only_for_listed_ingredients() {
        let plan = build(PolicyOptions::default().with_stockout_cost("Milk", 40.0));

        assert!(plan.vars.stockouts.row(0).iter().all(Option::is_none));
        assert!(plan.vars.stockouts.row(1).iter().all(Option::is_some));

        let stockout = plan.vars.stockouts[[1, 2]].clone().unwrap();
        assert_eq!(plan.model.obj_fn().coeff(&stockout), 40.0);
        assert_eq!(stockout.ub(), Some(2.0));
        let balance = plan
            .model
            .constraints_named("balance[Milk,Wed]")
            .next()
            .unwrap();
        assert!(balance.contains_var(&stockout));
    }

    struct MondayCap(f64);

    impl PolicyExtension for MondayCap {
        fn name(&self) -> &'static str {
            "monday cap"
        }

        fn constrain(&self, ctx: &mut PlanContext) {
            for i in 0..ctx.inputs.num_ingredients() {
                let cap = Constraint::new(&ctx.vars.orders[[i, 0]], Comp::Le, self.0)
                    .with_name(format!("cap[{},Mon]", ctx.label(i)));
                ctx.add_constraint(cap);
            }
        }
    }

    #[test]
    fn custom_extension_joins_the_model() {
        let inputs = inputs(14.0);
        let policy = PolicyOptions::default().resolve(inputs.labels()).unwrap();
        let plan = PlanModelBuilder::new(&inputs, &policy)
            .with_extension(Box::new(MondayCap(1.5)))
            .build();

        let caps: Vec<&Constraint> = plan.model.constraints_named("cap[").collect();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[1].name(), "cap[Milk,Mon]");
        assert!(caps[1].contains_var(&plan.vars.orders[[1, 0]]));
        //base rows untouched
        assert_eq!(plan.model.constraints_named("balance[").count(), 2 * HORIZON);
    }

    #[test]
    fn rejects_malformed_entries() {
        let labels = vec!["Beans".to_string(), "Milk".to_string()];
        let prices = DayTable::new(labels.clone(), Array2::from_elem((2, HORIZON), 10.0)).unwrap();

        let mut demand = DayTable::zeros(labels.clone());
        demand.set(1, 2, -0.5);
        assert_eq!(
            PlanningInputs::new(demand, prices.clone(), Array1::ones(2)),
            Err(ConfigurationError::InvalidQuantity {
                what: "demand",
                ingredient: "Milk".to_string(),
                day: 2,
                value: -0.5
            })
        );

        let mut demand = DayTable::zeros(labels.clone());
        demand.set(0, 6, f64::NAN);
        assert!(matches!(
            PlanningInputs::new(demand, prices.clone(), Array1::ones(2)),
            Err(ConfigurationError::InvalidQuantity { what: "demand", day: 6, .. })
        ));

        let mut bad_prices = prices.clone();
        bad_prices.set(0, 0, f64::INFINITY);
        assert!(matches!(
            PlanningInputs::new(DayTable::zeros(labels.clone()), bad_prices, Array1::ones(2)),
            Err(ConfigurationError::InvalidQuantity { what: "price", .. })
        ));

        assert!(matches!(
            PlanningInputs::new(DayTable::zeros(labels), prices, Array1::from(vec![1.0, f64::NAN])),
            Err(ConfigurationError::InvalidCost { what: "holding cost", .. })
        ));
    }

    #[test]
    fn prices_align_by_label() {
        let labels = vec!["Beans".to_string(), "Milk".to_string()];
        let demand = DayTable::zeros(labels);
        let mut values = Array2::zeros((2, HORIZON));
        values.row_mut(0).fill(6.0);
        values.row_mut(1).fill(14.0);
        let prices = DayTable::new(vec!["Milk".to_string(), "Beans".to_string()], values).unwrap();

        let inputs = PlanningInputs::new(demand.clone(), prices, Array1::zeros(2)).unwrap();
        assert_eq!(inputs.prices().get(0, 0), 14.0);

        let missing = DayTable::zeros(vec!["Beans".to_string()]);
        assert!(matches!(
            PlanningInputs::new(demand, missing, Array1::zeros(2)),
            Err(ConfigurationError::MissingRow { .. })
        ));
    }
}
