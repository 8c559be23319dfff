use rustc_hash::FxHashMap;
use std::fmt;

use crate::affine_expr::AffineExpression;
use crate::var::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comp {
    Le, // <=
    Ge, // >=
    Eq, // ==
}

impl fmt::Display for Comp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Comp::Le => write!(f, "\u{2264}"),
            Comp::Eq => write!(f, "="),
            Comp::Ge => write!(f, "\u{2265}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    name: String,
    lhs: AffineExpression,
    comp: Comp,
    rhs: AffineExpression,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} {} {}", self.name, self.lhs, self.comp, self.rhs)
    }
}

/// `Σ coeff·var (comp) rhs` with every variable on the left and the constant on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConstraint {
    pub terms: Vec<(Variable, f64)>,
    pub comp: Comp,
    pub rhs: f64,
}

impl Constraint {
    pub fn new<T: Into<AffineExpression>, U: Into<AffineExpression>>(
        lhs: T,
        comp: Comp,
        rhs: U,
    ) -> Self {
        Self {
            name: String::new(),
            lhs: lhs.into(),
            comp,
            rhs: rhs.into(),
        }
    }

    pub fn with_name<T: ToString>(mut self, name: T) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lhs(&self) -> &AffineExpression {
        &self.lhs
    }

    pub fn rhs(&self) -> &AffineExpression {
        &self.rhs
    }

    pub fn comp(&self) -> Comp {
        self.comp
    }

    pub fn variables(&self) -> Vec<Variable> {
        (self.lhs.clone() - self.rhs.clone()).variables()
    }

    pub fn contains_var(&self, var: &Variable) -> bool {
        self.lhs.contains_var(var) || self.rhs.contains_var(var)
    }

    pub fn normalized(&self) -> NormalizedConstraint {
        //move all variables to lhs, constant to rhs
        let moved = self.lhs.clone() - self.rhs.clone();
        let rhs = -moved.constant();
        let mut terms: Vec<(Variable, f64)> = moved.terms().map(|(v, c)| (v.clone(), c)).collect();
        terms.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));
        NormalizedConstraint {
            terms,
            comp: self.comp,
            rhs,
        }
    }

    /// Signed amount by which `values` violates the constraint; zero when satisfied.
    pub fn violation(&self, values: &FxHashMap<Variable, f64>) -> f64 {
        let diff = self.lhs.eval(values) - self.rhs.eval(values);
        match self.comp {
            Comp::Le => diff.max(0.0),
            Comp::Ge => (-diff).max(0.0),
            Comp::Eq => diff.abs(),
        }
    }

    pub fn is_satisfied(&self, values: &FxHashMap<Variable, f64>, tol: f64) -> bool {
        self.violation(values) <= tol
    }
}
