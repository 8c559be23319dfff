use num::ToPrimitive;
use std::{
    cell::RefCell,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use uuid::Uuid; //used for variables ID

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum VarType {
    #[default]
    Continuous,
    Binary,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VarType::Continuous => write!(f, "continuous"),
            VarType::Binary => write!(f, "binary"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VariableDefinition {
    ty: VarType,
    lb: Option<f64>,
    ub: Option<f64>,
    name: String,
}

impl VariableDefinition {
    pub fn new(ty: VarType) -> Self {
        match ty {
            //binaries always live in [0, 1]
            VarType::Binary => Self {
                ty,
                lb: Some(0.0),
                ub: Some(1.0),
                name: String::new(),
            },
            VarType::Continuous => Self {
                ty,
                lb: None,
                ub: None,
                name: String::new(),
            },
        }
    }

    /// Non-negative continuous variable, the common case for order quantities and stock.
    pub fn non_negative() -> Self {
        Self::new(VarType::Continuous).with_lb(0)
    }

    pub fn with_lb<T: ToPrimitive>(mut self, lb: T) -> Self {
        self.lb = lb.to_f64();
        debug_assert!(self.valid_bounds());
        self
    }

    pub fn with_ub<T: ToPrimitive>(mut self, ub: T) -> Self {
        self.ub = ub.to_f64();
        debug_assert!(self.valid_bounds());
        self
    }

    pub fn with_name<T: ToString>(mut self, name: T) -> Self {
        self.name = name.to_string();
        self
    }

    fn valid_bounds(&self) -> bool {
        //ensure if both bounds exist, lb <= ub
        match (self.lb, self.ub) {
            (Some(lb), Some(ub)) => lb <= ub,
            _ => true,
        }
    }
}

#[derive(Debug)]
struct RawModelVariable {
    ty: VarType,
    lb: Option<f64>,
    ub: Option<f64>,
    name: String,
    id: Uuid,
}

/// Handle to a decision variable. Cloning is cheap; identity is the id, not the name.
#[derive(Clone, Debug)]
pub struct Variable {
    raw: Rc<RawModelVariable>,
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.raw.id == other.raw.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Variable {
    pub fn new(env: &mut Environment, variable_definition: VariableDefinition) -> Self {
        env.add_var(variable_definition)
    }

    pub fn ty(&self) -> VarType {
        self.raw.ty
    }

    pub fn lb(&self) -> Option<f64> {
        self.raw.lb
    }

    pub fn ub(&self) -> Option<f64> {
        self.raw.ub
    }

    pub fn name(&self) -> &str {
        self.raw.name.as_str()
    }

    pub fn is_binary(&self) -> bool {
        self.raw.ty == VarType::Binary
    }
}

/// Registry of every variable created for one model, in creation order.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    collection: Rc<RefCell<Vec<Variable>>>,
    env_id: Uuid,
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.env_id == other.env_id
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            collection: Rc::default(),
            env_id: Uuid::new_v4(),
        }
    }

    pub fn add_var(&mut self, var_def: VariableDefinition) -> Variable {
        let var = Variable {
            raw: Rc::new(RawModelVariable {
                ty: var_def.ty,
                lb: var_def.lb,
                ub: var_def.ub,
                name: var_def.name,
                id: Uuid::new_v4(),
            }),
        };
        self.collection.borrow_mut().push(var.clone());
        var
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.collection.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.collection.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_definition_is_unit_bounded() {
        let mut env = Environment::new();
        let y = Variable::new(&mut env, VariableDefinition::new(VarType::Binary).with_name("y"));

        assert!(y.is_binary());
        assert_eq!(y.lb(), Some(0.0));
        assert_eq!(y.ub(), Some(1.0));
    }

    #[test]
    fn identity_ignores_name() {
        let mut env = Environment::new();
        let a = Variable::new(&mut env, VariableDefinition::non_negative().with_name("x"));
        let b = Variable::new(&mut env, VariableDefinition::non_negative().with_name("x"));

        assert!(a != b);
        assert!(a == a.clone());
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn environment_keeps_creation_order() {
        let mut env = Environment::new();
        let names = ["order", "inventory", "stockout"];
        for name in names {
            env.add_var(VariableDefinition::non_negative().with_name(name));
        }

        let seen: Vec<String> = env.variables().iter().map(|v| v.name().to_string()).collect();
        assert_eq!(seen, names);
    }

    #[test]
    fn shared_environment_sees_new_variables() {
        let mut env = Environment::new();
        let view = env.clone();
        env.add_var(VariableDefinition::non_negative().with_ub(3.5));

        assert_eq!(view.len(), 1);
        assert!(view == env);
        assert_eq!(view.variables()[0].ub(), Some(3.5));
    }
}
