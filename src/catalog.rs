use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::error::ConfigurationError;

/// A raw material bought by weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// currency per kg
    pub base_cost: f64,
    /// currency per kg per day held
    pub holding_cost: f64,
}

impl Ingredient {
    pub fn new(name: &str, base_cost: f64, holding_cost: f64) -> Self {
        Self {
            name: name.to_string(),
            base_cost,
            holding_cost,
        }
    }
}

/// A sellable item and the kilograms of each ingredient one unit consumes, in catalog
/// ingredient order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub recipe: Vec<f64>,
}

/// Ingredients and products known to the planner. Passed explicitly into every planning
/// call; extending it produces a new snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    ingredients: Vec<Ingredient>,
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(ingredients: Vec<Ingredient>) -> Self {
        Self {
            ingredients,
            products: Vec::new(),
        }
    }

    /// The coffee shop the planner was built for: four ingredients, three drinks.
    pub fn coffee_shop() -> Self {
        let ingredients = vec![
            Ingredient::new("Coffee Beans", 14.0, 2.6),
            Ingredient::new("Milk Foam", 8.0, 0.6),
            Ingredient::new("Steamed Milk", 6.0, 1.0),
            Ingredient::new("Chocolate Powder", 5.0, 0.3),
        ];
        let products = vec![
            Product {
                name: "Cappuccino".to_string(),
                recipe: vec![0.040, 0.010, 0.010, 0.0],
            },
            Product {
                name: "Latte".to_string(),
                recipe: vec![0.025, 0.005, 0.020, 0.0],
            },
            Product {
                name: "Mocha".to_string(),
                recipe: vec![0.030, 0.0, 0.020, 0.015],
            },
        ];
        Self {
            ingredients,
            products,
        }
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn ingredient_names(&self) -> Vec<String> {
        self.ingredients.iter().map(|i| i.name.clone()).collect()
    }

    pub fn ingredient_index(&self, name: &str) -> Option<usize> {
        self.ingredients.iter().position(|i| i.name == name)
    }

    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn base_prices(&self) -> Array1<f64> {
        self.ingredients.iter().map(|i| i.base_cost).collect()
    }

    pub fn holding_costs(&self) -> Array1<f64> {
        self.ingredients.iter().map(|i| i.holding_cost).collect()
    }

    /// kg per unit, ingredient × product.
    pub fn recipe_matrix(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.ingredients.len(), self.products.len()), |(i, p)| {
            self.products[p].recipe.get(i).copied().unwrap_or(0.0)
        })
    }

    /// Returns a catalog extended with `name`. The recipe needs one entry per existing
    /// ingredient and nothing else.
    pub fn add_product(
        &self,
        name: &str,
        recipe: &BTreeMap<String, f64>,
    ) -> Result<Catalog, ConfigurationError> {
        if self.product(name).is_some() {
            return Err(ConfigurationError::DuplicateProduct(name.to_string()));
        }
        if let Some(unknown) = recipe.keys().find(|k| self.ingredient_index(k).is_none()) {
            return Err(ConfigurationError::UnknownIngredient(unknown.clone()));
        }

        let mut quantities = Vec::with_capacity(self.ingredients.len());
        for ingredient in &self.ingredients {
            let quantity = *recipe.get(&ingredient.name).ok_or_else(|| {
                ConfigurationError::IncompleteRecipe {
                    product: name.to_string(),
                    ingredient: ingredient.name.clone(),
                }
            })?;
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(ConfigurationError::InvalidRecipeQuantity {
                    product: name.to_string(),
                    ingredient: ingredient.name.clone(),
                    quantity,
                });
            }
            quantities.push(quantity);
        }

        let mut extended = self.clone();
        extended.products.push(Product {
            name: name.to_string(),
            recipe: quantities,
        });
        Ok(extended)
    }
}
