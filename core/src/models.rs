use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Measurement units an ingredient quantity can carry.
///
/// A missing unit (`Option<Unit>::None`) means the quantity is a bare count
/// ("3 eggs") and is kept apart from every concrete unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "tsp")]
    Teaspoon,
    #[serde(rename = "tbsp")]
    Tablespoon,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "pc")]
    Piece,
    #[serde(rename = "pinch")]
    Pinch,
}

pub const UNITS: &[Unit] = &[
    Unit::Gram,
    Unit::Kilogram,
    Unit::Milliliter,
    Unit::Liter,
    Unit::Teaspoon,
    Unit::Tablespoon,
    Unit::Cup,
    Unit::Piece,
    Unit::Pinch,
];

impl Unit {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Teaspoon => "tsp",
            Unit::Tablespoon => "tbsp",
            Unit::Cup => "cup",
            Unit::Piece => "pc",
            Unit::Pinch => "pinch",
        }
    }

    /// Parse a unit from its symbol or a common spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "g" | "gram" | "grams" | "gr" => Some(Unit::Gram),
            "kg" | "kilogram" | "kilograms" | "kilo" | "kilos" => Some(Unit::Kilogram),
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                Some(Unit::Milliliter)
            }
            "l" | "liter" | "liters" | "litre" | "litres" => Some(Unit::Liter),
            "tsp" | "teaspoon" | "teaspoons" => Some(Unit::Teaspoon),
            "tbsp" | "tablespoon" | "tablespoons" => Some(Unit::Tablespoon),
            "cup" | "cups" => Some(Unit::Cup),
            "pc" | "pcs" | "piece" | "pieces" => Some(Unit::Piece),
            "pinch" | "pinches" => Some(Unit::Pinch),
            _ => None,
        }
    }

    /// Express `quantity` in the canonical unit this one folds into before
    /// aggregation. Grams become kilograms and millilitres become litres.
    #[must_use]
    pub fn to_canonical(self, quantity: f64) -> (Unit, f64) {
        match self {
            Unit::Gram => (Unit::Kilogram, quantity / 1000.0),
            Unit::Milliliter => (Unit::Liter, quantity / 1000.0),
            other => (other, quantity),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Unit::parse(s) {
            Some(unit) => Ok(unit),
            None => bail!(
                "Unknown unit '{s}'. Supported: {}",
                UNITS.iter().map(|u| u.symbol()).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

// --- Grocery aggregation types ---

/// One ingredient line: a planned meal's recipe ingredient, or a line read
/// from an imported recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientUsage {
    pub ingredient_name: String,
    pub quantity: f64,
    pub unit: Option<Unit>,
}

impl IngredientUsage {
    pub fn new(name: impl Into<String>, quantity: f64, unit: Option<Unit>) -> Self {
        Self {
            ingredient_name: name.into(),
            quantity,
            unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAmount {
    pub unit: Option<Unit>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedIngredient {
    pub name: String,
    pub amounts_by_unit: Vec<UnitAmount>,
    #[serde(default)]
    pub is_checked: bool,
}

impl AggregatedIngredient {
    #[must_use]
    pub fn total_for(&self, unit: Option<Unit>) -> Option<f64> {
        self.amounts_by_unit
            .iter()
            .find(|a| a.unit == unit)
            .map(|a| a.total)
    }
}

// --- Recipe / plan records ---

#[derive(Debug, Clone, Serialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub servings: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub quantity: f64,
    pub unit: Option<Unit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub name: String,
    pub servings: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedMeal {
    pub id: i64,
    pub date: NaiveDate,
    pub meal_type: String,
    pub recipe_id: i64,
    pub recipe_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPlannedMeal {
    pub date: NaiveDate,
    pub meal_type: String,
    pub recipe_id: i64,
}

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

pub fn validate_meal_type(meal: &str) -> Result<String> {
    let lower = meal.to_lowercase();
    if MEAL_TYPES.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid meal type '{meal}'. Must be one of: {}",
            MEAL_TYPES.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_meal_types() {
        assert_eq!(validate_meal_type("breakfast").unwrap(), "breakfast");
        assert_eq!(validate_meal_type("lunch").unwrap(), "lunch");
        assert_eq!(validate_meal_type("dinner").unwrap(), "dinner");
        assert_eq!(validate_meal_type("snack").unwrap(), "snack");
    }

    #[test]
    fn test_invalid_meal_type() {
        assert!(validate_meal_type("brunch").is_err());
        assert!(validate_meal_type("").is_err());
    }

    #[test]
    fn test_meal_type_case_insensitive() {
        assert_eq!(validate_meal_type("Lunch").unwrap(), "lunch");
        assert_eq!(validate_meal_type("DINNER").unwrap(), "dinner");
    }

    #[test]
    fn test_unit_parse_aliases() {
        assert_eq!(Unit::parse("g"), Some(Unit::Gram));
        assert_eq!(Unit::parse("Grams"), Some(Unit::Gram));
        assert_eq!(Unit::parse("KG"), Some(Unit::Kilogram));
        assert_eq!(Unit::parse("tablespoons"), Some(Unit::Tablespoon));
        assert_eq!(Unit::parse(" litre "), Some(Unit::Liter));
        assert_eq!(Unit::parse("cloves"), None);
    }

    #[test]
    fn test_unit_symbol_parses_back() {
        for unit in UNITS {
            assert_eq!(Unit::parse(unit.symbol()), Some(*unit));
        }
    }

    #[test]
    fn test_unit_from_str_error_lists_units() {
        let err = "bushel".parse::<Unit>().unwrap_err().to_string();
        assert!(err.contains("bushel"));
        assert!(err.contains("tbsp"));
    }

    #[test]
    fn test_unit_serializes_as_symbol() {
        let json = serde_json::to_string(&Unit::Tablespoon).unwrap();
        assert_eq!(json, "\"tbsp\"");
        let back: Unit = serde_json::from_str("\"kg\"").unwrap();
        assert_eq!(back, Unit::Kilogram);
    }

    #[test]
    fn test_unit_to_canonical() {
        assert_eq!(Unit::Gram.to_canonical(250.0), (Unit::Kilogram, 0.25));
        assert_eq!(Unit::Milliliter.to_canonical(500.0), (Unit::Liter, 0.5));
        assert_eq!(Unit::Cup.to_canonical(2.0), (Unit::Cup, 2.0));
        assert_eq!(Unit::Kilogram.to_canonical(1.5), (Unit::Kilogram, 1.5));
    }

    #[test]
    fn test_total_for() {
        let item = AggregatedIngredient {
            name: "Rice".to_string(),
            amounts_by_unit: vec![
                UnitAmount {
                    unit: Some(Unit::Kilogram),
                    total: 0.5,
                },
                UnitAmount {
                    unit: None,
                    total: 2.0,
                },
            ],
            is_checked: false,
        };
        assert_eq!(item.total_for(Some(Unit::Kilogram)), Some(0.5));
        assert_eq!(item.total_for(None), Some(2.0));
        assert_eq!(item.total_for(Some(Unit::Cup)), None);
    }
}
