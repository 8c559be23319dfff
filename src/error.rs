use thiserror::Error;

/// Malformed planning input. Raised before any model is built; never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("discount rate {0} is outside [0, 1]")]
    DiscountRateOutOfRange(f64),

    #[error("day index {0} is outside the 7-day planning week")]
    DayOutOfRange(usize),

    #[error("at least one ordering day must be allowed")]
    NoOrderingDays,

    #[error("minimum order quantity for {ingredient} must be finite and non-negative, got {quantity}")]
    InvalidMinimumOrder { ingredient: String, quantity: f64 },

    #[error("stockout cost for {ingredient} must be finite and non-negative, got {cost}")]
    InvalidStockoutCost { ingredient: String, cost: f64 },

    #[error("shelf life for {0} must be at least one day")]
    ZeroShelfLife(String),

    #[error("unknown ingredient {0:?}")]
    UnknownIngredient(String),

    #[error("product {0:?} already exists")]
    DuplicateProduct(String),

    #[error("recipe for {product:?} has no entry for ingredient {ingredient:?}")]
    IncompleteRecipe { product: String, ingredient: String },

    #[error("recipe for {product:?} uses {quantity} kg of {ingredient:?}; quantities must be finite and non-negative")]
    InvalidRecipeQuantity {
        product: String,
        ingredient: String,
        quantity: f64,
    },

    #[error("{what} factor {value} must be finite and non-negative")]
    InvalidFactor { what: &'static str, value: f64 },

    #[error("solver time limit must be a positive number of seconds, got {0}")]
    InvalidTimeLimit(f64),

    #[error("{what} has {found} rows or columns where {expected} were expected")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{what} for {ingredient:?} on day {day} is {value}")]
    InvalidQuantity {
        what: &'static str,
        ingredient: String,
        day: usize,
        value: f64,
    },

    #[error("{what} for {ingredient:?} must be finite, got {value}")]
    InvalidCost {
        what: &'static str,
        ingredient: String,
        value: f64,
    },

    #[error("{what} has no row for ingredient {ingredient:?}")]
    MissingRow { what: &'static str, ingredient: String },
}
