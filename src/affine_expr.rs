use crate::var::Variable;
use rustc_hash::FxHashMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// `Σ coeff·var + constant`. Terms with a zero coefficient are never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AffineExpression {
    pub(crate) coeffs: FxHashMap<Variable, f64>,
    pub(crate) constant: f64,
}

impl fmt::Display for AffineExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mult = "\u{00D7}";
        //sort by name so the rendering is stable
        let mut terms: Vec<(&Variable, &f64)> = self.coeffs.iter().collect();
        terms.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));

        for (i, (var, coeff)) in terms.iter().enumerate() {
            match (i, **coeff < 0.0) {
                (0, false) => write!(f, "{}{}{}", coeff, mult, var)?,
                (0, true) => write!(f, "-{}{}{}", coeff.abs(), mult, var)?,
                (_, false) => write!(f, " + {}{}{}", coeff, mult, var)?,
                (_, true) => write!(f, " - {}{}{}", coeff.abs(), mult, var)?,
            }
        }
        if terms.is_empty() {
            write!(f, "{}", self.constant)?;
        } else if self.constant > 0.0 {
            write!(f, " + {}", self.constant)?;
        } else if self.constant < 0.0 {
            write!(f, " - {}", self.constant.abs())?;
        }
        Ok(())
    }
}

impl From<&Variable> for AffineExpression {
    fn from(var: &Variable) -> Self {
        let mut expr = Self::default();
        expr.coeffs.insert(var.clone(), 1.0_f64);
        expr
    }
}

impl From<Variable> for AffineExpression {
    fn from(var: Variable) -> Self {
        Self::from(&var)
    }
}

impl AffineExpression {
    pub fn new(coeffs: FxHashMap<Variable, f64>, constant: f64) -> Self {
        let mut expr = Self { coeffs, constant };
        expr.coeffs.retain(|_, c| *c != 0.0_f64);
        expr
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.coeffs.keys().cloned().collect()
    }

    pub fn coeff(&self, var: &Variable) -> f64 {
        self.coeffs.get(var).copied().unwrap_or(0.0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Variable, f64)> {
        self.coeffs.iter().map(|(var, c)| (var, *c))
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn constant_mut(&mut self) -> &mut f64 {
        &mut self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn contains_var(&self, var: &Variable) -> bool {
        self.coeffs.contains_key(var)
    }

    /// Adds `coeff × var` in place; cheaper than building a temporary expression.
    pub fn add_term(&mut self, var: &Variable, coeff: f64) {
        let c = self.coeffs.entry(var.clone()).or_insert(0.0_f64);
        *c += coeff;
        if *c == 0.0_f64 {
            self.coeffs.remove(var);
        }
    }

    /// Evaluates the expression. Variables missing from `values` count as zero.
    pub fn eval(&self, values: &FxHashMap<Variable, f64>) -> f64 {
        self.coeffs
            .iter()
            .map(|(var, coeff)| coeff * values.get(var).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

//AF + AF -> AF
impl Add for AffineExpression {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

//AF - AF -> AF
impl Sub for AffineExpression {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

//AF + V -> AF
impl Add<&Variable> for AffineExpression {
    type Output = Self;

    fn add(mut self, rhs: &Variable) -> Self::Output {
        self.add_term(rhs, 1.0);
        self
    }
}

//AF - V -> AF
impl Sub<&Variable> for AffineExpression {
    type Output = Self;

    fn sub(mut self, rhs: &Variable) -> Self::Output {
        self.add_term(rhs, -1.0);
        self
    }
}

//V + AF -> AF
impl Add<AffineExpression> for &Variable {
    type Output = AffineExpression;

    fn add(self, mut rhs: AffineExpression) -> Self::Output {
        rhs.add_term(self, 1.0);
        rhs
    }
}

//V - AF -> AF
impl Sub<AffineExpression> for &Variable {
    type Output = AffineExpression;

    fn sub(self, rhs: AffineExpression) -> Self::Output {
        let mut expr = -rhs;
        expr.add_term(self, 1.0);
        expr
    }
}

//V + V -> AF
impl Add for &Variable {
    type Output = AffineExpression;

    fn add(self, rhs: Self) -> Self::Output {
        AffineExpression::from(self) + rhs
    }
}

//V - V -> AF
impl Sub for &Variable {
    type Output = AffineExpression;

    fn sub(self, rhs: Self) -> Self::Output {
        AffineExpression::from(self) - rhs
    }
}

//AF += AF
impl AddAssign for AffineExpression {
    fn add_assign(&mut self, rhs: Self) {
        for (var, coeff) in rhs.coeffs.iter() {
            self.add_term(var, *coeff);
        }
        self.constant += rhs.constant;
    }
}

//AF -= AF
impl SubAssign for AffineExpression {
    fn sub_assign(&mut self, rhs: Self) {
        for (var, coeff) in rhs.coeffs.iter() {
            self.add_term(var, -*coeff);
        }
        self.constant -= rhs.constant;
    }
}

//AF += V
impl AddAssign<&Variable> for AffineExpression {
    fn add_assign(&mut self, rhs: &Variable) {
        self.add_term(rhs, 1.0);
    }
}

//AF -= V
impl SubAssign<&Variable> for AffineExpression {
    fn sub_assign(&mut self, rhs: &Variable) {
        self.add_term(rhs, -1.0);
    }
}

//-AF
impl Neg for AffineExpression {
    type Output = AffineExpression;

    fn neg(mut self) -> Self::Output {
        self.coeffs.values_mut().for_each(|c| *c = -*c);
        self.constant = -self.constant;
        self
    }
}

//-V
impl Neg for &Variable {
    type Output = AffineExpression;

    fn neg(self) -> Self::Output {
        -AffineExpression::from(self)
    }
}

impl Sum for AffineExpression {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(AffineExpression::default(), |acc, e| acc + e)
    }
}

impl<'a> Sum<&'a Variable> for AffineExpression {
    fn sum<I: Iterator<Item = &'a Variable>>(iter: I) -> Self {
        iter.fold(AffineExpression::default(), |acc, v| acc + v)
    }
}

//scalar <-> AF / V arithmetic for every primitive numeric type
macro_rules! scalar_affine_impl(
    ($($T: ty), *$(, )*) => {$(
        impl From<$T> for AffineExpression {
            fn from(num: $T) -> Self {
                Self {
                    coeffs: FxHashMap::default(),
                    constant: num as f64,
                }
            }
        }

        //AF + C
        impl Add<$T> for AffineExpression {
            type Output = AffineExpression;

            fn add(mut self, rhs: $T) -> Self::Output {
                self.constant += rhs as f64;
                self
            }
        }

        //C + AF
        impl Add<AffineExpression> for $T {
            type Output = AffineExpression;

            fn add(self, rhs: AffineExpression) -> Self::Output {
                rhs + self
            }
        }

        //AF - C
        impl Sub<$T> for AffineExpression {
            type Output = AffineExpression;

            fn sub(mut self, rhs: $T) -> Self::Output {
                self.constant -= rhs as f64;
                self
            }
        }

        //C - AF
        impl Sub<AffineExpression> for $T {
            type Output = AffineExpression;

            fn sub(self, rhs: AffineExpression) -> Self::Output {
                -rhs + self
            }
        }

        //AF * C
        impl Mul<$T> for AffineExpression {
            type Output = AffineExpression;

            fn mul(mut self, rhs: $T) -> Self::Output {
                self *= rhs;
                self
            }
        }

        //C * AF
        impl Mul<AffineExpression> for $T {
            type Output = AffineExpression;

            fn mul(self, rhs: AffineExpression) -> Self::Output {
                rhs * self
            }
        }

        //V * C
        impl Mul<$T> for &Variable {
            type Output = AffineExpression;

            fn mul(self, rhs: $T) -> Self::Output {
                let mut expr = AffineExpression::default();
                expr.add_term(self, rhs as f64);
                expr
            }
        }

        //C * V
        impl Mul<&Variable> for $T {
            type Output = AffineExpression;

            fn mul(self, rhs: &Variable) -> Self::Output {
                rhs * self
            }
        }

        //V + C
        impl Add<$T> for &Variable {
            type Output = AffineExpression;

            fn add(self, rhs: $T) -> Self::Output {
                AffineExpression::from(self) + rhs
            }
        }

        //V - C
        impl Sub<$T> for &Variable {
            type Output = AffineExpression;

            fn sub(self, rhs: $T) -> Self::Output {
                AffineExpression::from(self) - rhs
            }
        }

        //AF += C
        impl AddAssign<$T> for AffineExpression {
            fn add_assign(&mut self, rhs: $T) {
                self.constant += rhs as f64;
            }
        }

        //AF -= C
        impl SubAssign<$T> for AffineExpression {
            fn sub_assign(&mut self, rhs: $T) {
                self.constant -= rhs as f64;
            }
        }

        //AF *= C
        impl MulAssign<$T> for AffineExpression {
            fn mul_assign(&mut self, rhs: $T) {
                let factor = rhs as f64;
                self.coeffs.values_mut().for_each(|c| *c *= factor);
                self.coeffs.retain(|_, c| *c != 0.0_f64);
                self.constant *= factor;
            }
        }
    )*}
);

scalar_affine_impl!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::{Environment, VarType, VariableDefinition};

    fn two_vars() -> (Variable, Variable) {
        let vda = VariableDefinition::new(VarType::Continuous).with_lb(0).with_name("a");
        let vdb = VariableDefinition::new(VarType::Continuous).with_lb(0).with_name("b");

        let mut env = Environment::new();

        let va = Variable::new(&mut env, vda);
        let vb = Variable::new(&mut env, vdb);
        (va, vb)
    }

    #[test]
    fn af_add_af() {
        let (va, vb) = two_vars();

        let mut af1 = AffineExpression::from(&va);
        let mut af2 = AffineExpression::from(&vb);

        *af1.constant_mut() = 1.0_f64;
        *af2.constant_mut() = 2.0_f64;
        //(a + 1) + (b+2)
        let af3 = af1 + af2;

        let coeffs = FxHashMap::from_iter([(va.clone(), 1.0_f64), (vb.clone(), 1.0_f64)]);
        let af3_comp = AffineExpression::new(coeffs, 3.0_f64);
        //(a+1)+(b+2) = a+b+3
        assert!(af3 == af3_comp);
    }

    #[test]
    fn af_sub_af() {
        let (va, vb) = two_vars();

        let af1 = &va + 1;
        let af2 = &vb + 2;
        //(a + 1) - (b+2)
        let af3 = af1 - af2;

        let coeffs = FxHashMap::from_iter([(va.clone(), 1.0_f64), (vb.clone(), -1.0_f64)]);
        let af3_comp = AffineExpression::new(coeffs, -1.0_f64);
        assert!(af3 == af3_comp);
    }

    #[test]
    fn cancelling_terms_are_dropped() {
        let (va, vb) = two_vars();

        //(a + b) - a = b
        let expr: AffineExpression = (&va + &vb) - &va;

        assert!(!expr.contains_var(&va));
        assert_eq!(expr.coeff(&vb), 1.0);
        assert_eq!(expr.variables().len(), 1);
    }

    #[test]
    fn scalar_products() {
        let (va, vb) = two_vars();

        //2.5a - 3b + 4
        let expr: AffineExpression = 2.5 * &va - 3 * &vb + 4;

        assert_eq!(expr.coeff(&va), 2.5);
        assert_eq!(expr.coeff(&vb), -3.0);
        assert_eq!(expr.constant(), 4.0);

        let doubled: AffineExpression = expr.clone() * 2;
        assert_eq!(doubled.coeff(&vb), -6.0);
        assert_eq!(doubled.constant(), 8.0);

        let zeroed: AffineExpression = expr * 0.0;
        assert!(zeroed.is_constant());
    }

    #[test]
    fn negation() {
        let (va, _) = two_vars();

        let expr: AffineExpression = -(&va + 1.5_f64);
        assert_eq!(expr.coeff(&va), -1.0);
        assert_eq!(expr.constant(), -1.5);

        //1 - a
        let expr: AffineExpression = 1 - AffineExpression::from(&va);
        assert_eq!(expr.coeff(&va), -1.0);
        assert_eq!(expr.constant(), 1.0);
    }

    #[test]
    fn sum_of_variables_and_expressions() {
        let (va, vb) = two_vars();

        let vars = vec![va.clone(), vb.clone(), va.clone()];
        let total: AffineExpression = vars.iter().sum();
        assert_eq!(total.coeff(&va), 2.0);
        assert_eq!(total.coeff(&vb), 1.0);

        let weighted: AffineExpression = [(1.0, &va), (0.5, &vb)]
            .into_iter()
            .map(|(c, v)| c * v)
            .sum();
        assert_eq!(weighted.coeff(&vb), 0.5);
    }

    #[test]
    fn eval_uses_zero_for_missing_values() {
        let (va, vb) = two_vars();

        let expr: AffineExpression = 2 * &va + &vb + 1;
        let values = FxHashMap::from_iter([(va.clone(), 3.0_f64)]);

        //2*3 + 0 + 1
        assert_eq!(expr.eval(&values), 7.0);
    }

    #[test]
    fn display_is_sorted_by_name() {
        let (va, vb) = two_vars();

        let expr: AffineExpression = &vb - 2 * &va + 1;
        assert_eq!(format!("{}", expr), "-2\u{00D7}a + 1\u{00D7}b + 1");
        assert_eq!(format!("{}", AffineExpression::from(0.0)), "0");
    }
}
