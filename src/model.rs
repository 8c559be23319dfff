use tabular::{Row, Table};

use std::fmt;

use crate::affine_expr::AffineExpression;
use crate::constraint::Constraint;
use crate::var::{Environment, Variable};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptDir {
    Max,
    Min,
}

impl fmt::Display for OptDir {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptDir::Max => write!(f, "Max"),
            OptDir::Min => write!(f, "Min"),
        }
    }
}

/// Engine-neutral LP/MIP: objective, direction and constraints over the variables of one
/// [`Environment`].
#[derive(Clone, Debug)]
pub struct Model {
    pub(crate) obj_fn: AffineExpression,
    pub(crate) opt_dir: OptDir,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) env: Environment,
}

impl Model {
    pub fn new(env: Environment) -> Self {
        Self {
            obj_fn: AffineExpression::default(),
            constraints: Vec::new(),
            opt_dir: OptDir::Min,
            env,
        }
    }

    //set objective function and optimization direction
    pub fn set_obj_fn(&mut self, opt_dir: OptDir, obj_fn: AffineExpression) {
        self.obj_fn = obj_fn;
        self.opt_dir = opt_dir;
    }

    //add a constraint to model
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn obj_fn(&self) -> &AffineExpression {
        &self.obj_fn
    }

    pub fn opt_dir(&self) -> OptDir {
        self.opt_dir
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Every variable of the environment in creation order, including ones no constraint uses.
    pub fn variables(&self) -> Vec<Variable> {
        self.env.variables()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables().iter().filter(|v| v.is_binary()).count()
    }

    pub fn constraints_named<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Constraint> {
        self.constraints
            .iter()
            .filter(move |c| c.name().starts_with(prefix))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        //OptDir: ObjFn
        //Subject To:
        //    name: lhs comp rhs
        let mut table = Table::new("{:<} {:<}  {:>} {:^} {:<}");

        table.add_row(
            Row::new()
                .with_cell(self.opt_dir)
                .with_cell(":")
                .with_cell(&self.obj_fn)
                .with_cell("")
                .with_cell(""),
        );
        table.add_row(
            Row::new()
                .with_cell("Subject to")
                .with_cell(":")
                .with_cell("")
                .with_cell("")
                .with_cell(""),
        );

        for constraint in &self.constraints {
            table.add_row(
                Row::new()
                    .with_cell(constraint.name())
                    .with_cell(":")
                    .with_cell(constraint.lhs())
                    .with_cell(constraint.comp())
                    .with_cell(constraint.rhs()),
            );
        }

        let binaries = self.num_binaries();
        write!(f, "{}", table)?;
        write!(
            f,
            "{} variables ({} binary), {} constraints",
            self.env.len(),
            binaries,
            self.constraints.len()
        )
    }
}
