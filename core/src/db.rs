use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::models::{
    Ingredient, IngredientUsage, NewPlannedMeal, PlannedMeal, Recipe, RecipeDetail,
    RecipeIngredient, Unit,
};
use crate::service::MealDataProvider;
use crate::store::KeyValueStore;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    servings REAL NOT NULL DEFAULT 1.0,
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                    quantity REAL NOT NULL,
                    unit TEXT
                );

                CREATE TABLE IF NOT EXISTS planned_meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date TEXT NOT NULL,
                    meal_type TEXT NOT NULL,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS preferences (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_planned_meals_date ON planned_meals(date);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            servings: row.get(2)?,
            notes: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn recipe_ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredient> {
        let unit: Option<String> = row.get(5)?;
        Ok(RecipeIngredient {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            ingredient_id: row.get(2)?,
            ingredient_name: row.get(3)?,
            quantity: row.get(4)?,
            unit: unit.as_deref().and_then(Unit::parse),
        })
    }

    fn planned_meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<PlannedMeal> {
        let date: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(PlannedMeal {
            id: row.get(0)?,
            date,
            meal_type: row.get(2)?,
            recipe_id: row.get(3)?,
            recipe_name: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    // --- Ingredients ---

    pub fn get_or_create_ingredient(&self, name: &str) -> Result<Ingredient> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Ingredient name must not be empty");
        }
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO ingredients (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        )?;
        let ingredient = self.conn.query_row(
            "SELECT id, name, created_at FROM ingredients WHERE name = ?1",
            params![name],
            |row| {
                Ok(Ingredient {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )?;
        Ok(ingredient)
    }

    pub fn list_ingredients(&self, search: Option<&str>) -> Result<Vec<Ingredient>> {
        let pattern = format!("%{}%", search.unwrap_or(""));
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at FROM ingredients
             WHERE name LIKE ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok(Ingredient {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, name: &str, servings: f64) -> Result<Recipe> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Recipe name must not be empty");
        }
        if servings <= 0.0 {
            bail!("Servings must be greater than 0");
        }
        if self.find_recipe_by_name(name)?.is_some() {
            bail!("Recipe '{name}' already exists");
        }
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO recipes (name, servings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![name, servings, now],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name, "created recipe");
        self.get_recipe_by_id(id)
    }

    pub fn get_recipe_by_id(&self, id: i64) -> Result<Recipe> {
        self.conn
            .query_row(
                "SELECT id, name, servings, notes, created_at, updated_at
                 FROM recipes WHERE id = ?1",
                params![id],
                Self::recipe_from_row,
            )
            .with_context(|| format!("Recipe {id} not found"))
    }

    pub fn find_recipe_by_name(&self, name: &str) -> Result<Option<Recipe>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, servings, notes, created_at, updated_at
                 FROM recipes WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                Self::recipe_from_row,
            )
            .optional()?)
    }

    pub fn get_recipe_by_name(&self, name: &str) -> Result<Recipe> {
        self.find_recipe_by_name(name)?
            .with_context(|| format!("Recipe '{name}' not found"))
    }

    pub fn set_recipe_servings(&self, recipe_id: i64, servings: f64) -> Result<()> {
        if servings <= 0.0 {
            bail!("Servings must be greater than 0");
        }
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE recipes SET servings = ?1, updated_at = ?2 WHERE id = ?3",
            params![servings, now, recipe_id],
        )?;
        if rows == 0 {
            bail!("Recipe {recipe_id} not found");
        }
        Ok(())
    }

    pub fn set_recipe_notes(&self, recipe_id: i64, notes: Option<&str>) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE recipes SET notes = ?1, updated_at = ?2 WHERE id = ?3",
            params![notes, now, recipe_id],
        )?;
        if rows == 0 {
            bail!("Recipe {recipe_id} not found");
        }
        Ok(())
    }

    pub fn add_recipe_ingredient(
        &self,
        recipe_id: i64,
        ingredient_name: &str,
        quantity: f64,
        unit: Option<Unit>,
    ) -> Result<RecipeIngredient> {
        let recipe = self.get_recipe_by_id(recipe_id)?;
        let ingredient = self.get_or_create_ingredient(ingredient_name)?;
        self.conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit)
             VALUES (?1, ?2, ?3, ?4)",
            params![recipe.id, ingredient.id, quantity, unit.map(Unit::symbol)],
        )?;
        let id = self.conn.last_insert_rowid();
        self.touch_recipe(recipe.id)?;
        Ok(RecipeIngredient {
            id,
            recipe_id: recipe.id,
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name,
            quantity,
            unit,
        })
    }

    /// Create a recipe together with its ingredient lines. Either everything
    /// is stored or nothing is.
    pub fn create_recipe_with_ingredients(
        &self,
        name: &str,
        servings: f64,
        lines: &[IngredientUsage],
    ) -> Result<RecipeDetail> {
        let tx = self.conn.unchecked_transaction()?;
        let recipe = self.create_recipe(name, servings)?;
        for line in lines {
            self.add_recipe_ingredient(recipe.id, &line.ingredient_name, line.quantity, line.unit)
                .with_context(|| {
                    format!("Failed to add {} to {}", line.ingredient_name, recipe.name)
                })?;
        }
        tx.commit()?;
        debug!(id = recipe.id, lines = lines.len(), "created recipe with ingredients");
        self.get_recipe_detail(recipe.id)
    }

    /// Remove every line of `ingredient_name` from a recipe.
    pub fn remove_recipe_ingredient(&self, recipe_id: i64, ingredient_name: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM recipe_ingredients
             WHERE recipe_id = ?1
               AND ingredient_id IN (SELECT id FROM ingredients WHERE name = ?2 COLLATE NOCASE)",
            params![recipe_id, ingredient_name.trim()],
        )?;
        if rows > 0 {
            self.touch_recipe(recipe_id)?;
        }
        Ok(rows > 0)
    }

    pub fn get_recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT ri.id, ri.recipe_id, ri.ingredient_id, i.name, ri.quantity, ri.unit
             FROM recipe_ingredients ri
             JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id = ?1
             ORDER BY ri.id",
        )?;
        let rows = stmt.query_map(params![recipe_id], Self::recipe_ingredient_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let recipe = self.get_recipe_by_id(recipe_id)?;
        let ingredients = self.get_recipe_ingredients(recipe_id)?;
        Ok(RecipeDetail {
            id: recipe.id,
            name: recipe.name,
            servings: recipe.servings,
            notes: recipe.notes,
            ingredients,
        })
    }

    pub fn list_recipes(&self) -> Result<Vec<RecipeDetail>> {
        let ids: Vec<i64> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM recipes ORDER BY name COLLATE NOCASE")?;
            stmt.query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        ids.into_iter()
            .map(|id| self.get_recipe_detail(id))
            .collect()
    }

    /// Delete a recipe along with its ingredient lines and planned meals.
    pub fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
        Ok(rows > 0)
    }

    fn touch_recipe(&self, recipe_id: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE recipes SET updated_at = ?1 WHERE id = ?2",
            params![now, recipe_id],
        )?;
        Ok(())
    }

    // --- Meal plan ---

    pub fn plan_meal(&self, meal: &NewPlannedMeal) -> Result<PlannedMeal> {
        let meal_type = crate::models::validate_meal_type(&meal.meal_type)?;
        let recipe = self.get_recipe_by_id(meal.recipe_id)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO planned_meals (date, meal_type, recipe_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                meal.date.format("%Y-%m-%d").to_string(),
                meal_type,
                recipe.id,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, date = %meal.date, recipe = %recipe.name, "planned meal");
        self.get_planned_meal(id)
    }

    pub fn get_planned_meal(&self, id: i64) -> Result<PlannedMeal> {
        self.conn
            .query_row(
                "SELECT pm.id, pm.date, pm.meal_type, pm.recipe_id, r.name, pm.created_at
                 FROM planned_meals pm
                 JOIN recipes r ON r.id = pm.recipe_id
                 WHERE pm.id = ?1",
                params![id],
                Self::planned_meal_from_row,
            )
            .with_context(|| format!("Planned meal {id} not found"))
    }

    pub fn delete_planned_meal(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM planned_meals WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Planned meals in the inclusive range, ordered by date then meal slot.
    pub fn get_planned_meals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<PlannedMeal>> {
        let mut stmt = self.conn.prepare(
            "SELECT pm.id, pm.date, pm.meal_type, pm.recipe_id, r.name, pm.created_at
             FROM planned_meals pm
             JOIN recipes r ON r.id = pm.recipe_id
             WHERE pm.date BETWEEN ?1 AND ?2
             ORDER BY pm.date,
                CASE pm.meal_type
                    WHEN 'breakfast' THEN 1
                    WHEN 'lunch' THEN 2
                    WHEN 'dinner' THEN 3
                    WHEN 'snack' THEN 4
                END,
                pm.id",
        )?;
        let rows = stmt.query_map(
            params![
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            Self::planned_meal_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// One usage per recipe ingredient line per planned meal in the range.
    pub fn get_usages_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IngredientUsage>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.name, ri.quantity, ri.unit
             FROM planned_meals pm
             JOIN recipe_ingredients ri ON ri.recipe_id = pm.recipe_id
             JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE pm.date BETWEEN ?1 AND ?2
             ORDER BY pm.date, pm.id, ri.id",
        )?;
        let rows = stmt.query_map(
            params![
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            |row| {
                let unit: Option<String> = row.get(2)?;
                Ok(IngredientUsage {
                    ingredient_name: row.get(0)?,
                    quantity: row.get(1)?,
                    unit: unit.as_deref().and_then(Unit::parse),
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- Preferences ---

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM preferences WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_preference(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

impl KeyValueStore for Database {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_preference(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_preference(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.delete_preference(key)
    }
}

impl MealDataProvider for Database {
    fn usages_for_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<IngredientUsage>> {
        self.get_usages_for_date_range(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn soup(db: &Database) -> Recipe {
        let recipe = db.create_recipe("Potato Soup", 4.0).unwrap();
        db.add_recipe_ingredient(recipe.id, "Potato", 800.0, Some(Unit::Gram))
            .unwrap();
        db.add_recipe_ingredient(recipe.id, "Onion", 1.0, None)
            .unwrap();
        db.add_recipe_ingredient(recipe.id, "Stock", 1.0, Some(Unit::Liter))
            .unwrap();
        recipe
    }

    fn plan(db: &Database, date: NaiveDate, meal: &str, recipe_id: i64) -> PlannedMeal {
        db.plan_meal(&NewPlannedMeal {
            date,
            meal_type: meal.to_string(),
            recipe_id,
        })
        .unwrap()
    }

    #[test]
    fn test_create_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe("  Pancakes ", 2.0).unwrap();
        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.servings, 2.0);
        assert!(recipe.notes.is_none());
    }

    #[test]
    fn test_create_recipe_rejects_duplicates_and_bad_servings() {
        let db = Database::open_in_memory().unwrap();
        db.create_recipe("Pancakes", 2.0).unwrap();
        assert!(db.create_recipe("pancakes", 2.0).is_err());
        assert!(db.create_recipe("Waffles", 0.0).is_err());
        assert!(db.create_recipe("   ", 1.0).is_err());
    }

    #[test]
    fn test_get_recipe_by_name_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe("Potato Soup", 4.0).unwrap();
        assert_eq!(db.get_recipe_by_name("potato soup").unwrap().id, recipe.id);
        assert!(db.get_recipe_by_name("Gazpacho").is_err());
    }

    #[test]
    fn test_recipe_ingredients_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        let detail = db.get_recipe_detail(recipe.id).unwrap();
        assert_eq!(detail.ingredients.len(), 3);
        assert_eq!(detail.ingredients[0].ingredient_name, "Potato");
        assert_eq!(detail.ingredients[0].unit, Some(Unit::Gram));
        assert_eq!(detail.ingredients[1].unit, None);
        assert_eq!(detail.ingredients[2].unit, Some(Unit::Liter));
    }

    #[test]
    fn test_ingredients_are_shared() {
        let db = Database::open_in_memory().unwrap();
        let a = db.get_or_create_ingredient("Garlic").unwrap();
        let b = db.get_or_create_ingredient(" Garlic ").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(db.list_ingredients(None).unwrap().len(), 1);
        assert_eq!(db.list_ingredients(Some("gar")).unwrap().len(), 1);
        assert!(db.list_ingredients(Some("xyz")).unwrap().is_empty());
        assert!(db.get_or_create_ingredient("").is_err());
    }

    #[test]
    fn test_remove_recipe_ingredient() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        assert!(db.remove_recipe_ingredient(recipe.id, "onion").unwrap());
        assert!(!db.remove_recipe_ingredient(recipe.id, "onion").unwrap());
        assert_eq!(db.get_recipe_ingredients(recipe.id).unwrap().len(), 2);
    }

    #[test]
    fn test_set_servings_and_notes() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe("Chili", 4.0).unwrap();
        db.set_recipe_servings(recipe.id, 6.0).unwrap();
        db.set_recipe_notes(recipe.id, Some("better on day two"))
            .unwrap();
        let fetched = db.get_recipe_by_id(recipe.id).unwrap();
        assert_eq!(fetched.servings, 6.0);
        assert_eq!(fetched.notes.as_deref(), Some("better on day two"));
        db.set_recipe_notes(recipe.id, None).unwrap();
        assert!(db.get_recipe_by_id(recipe.id).unwrap().notes.is_none());
        assert!(db.set_recipe_notes(9999, Some("x")).is_err());
        assert!(db.set_recipe_servings(recipe.id, -1.0).is_err());
        assert!(db.set_recipe_servings(9999, 2.0).is_err());
    }

    #[test]
    fn test_list_recipes_sorted() {
        let db = Database::open_in_memory().unwrap();
        db.create_recipe("waffles", 1.0).unwrap();
        db.create_recipe("Apple Pie", 8.0).unwrap();
        let names: Vec<_> = db
            .list_recipes()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Apple Pie", "waffles"]);
    }

    #[test]
    fn test_delete_recipe_cascades() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        plan(&db, d(2025, 10, 13), "dinner", recipe.id);

        assert!(db.delete_recipe(recipe.id).unwrap());
        assert!(!db.delete_recipe(recipe.id).unwrap());
        assert!(db.get_recipe_ingredients(recipe.id).unwrap().is_empty());
        assert!(
            db.get_planned_meals(d(2025, 10, 13), d(2025, 10, 13))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_plan_meal_validates() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        let bad_meal = db.plan_meal(&NewPlannedMeal {
            date: d(2025, 10, 13),
            meal_type: "brunch".to_string(),
            recipe_id: recipe.id,
        });
        assert!(bad_meal.is_err());
        let bad_recipe = db.plan_meal(&NewPlannedMeal {
            date: d(2025, 10, 13),
            meal_type: "lunch".to_string(),
            recipe_id: 4242,
        });
        assert!(bad_recipe.is_err());
    }

    #[test]
    fn test_planned_meals_in_range_ordered() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        plan(&db, d(2025, 10, 14), "dinner", recipe.id);
        plan(&db, d(2025, 10, 14), "Breakfast", recipe.id);
        plan(&db, d(2025, 10, 13), "snack", recipe.id);
        plan(&db, d(2025, 10, 20), "lunch", recipe.id);

        let meals = db.get_planned_meals(d(2025, 10, 13), d(2025, 10, 19)).unwrap();
        let slots: Vec<_> = meals
            .iter()
            .map(|m| (m.date, m.meal_type.as_str()))
            .collect();
        assert_eq!(
            slots,
            vec![
                (d(2025, 10, 13), "snack"),
                (d(2025, 10, 14), "breakfast"),
                (d(2025, 10, 14), "dinner"),
            ]
        );
        assert_eq!(meals[0].recipe_name, "Potato Soup");
    }

    #[test]
    fn test_delete_planned_meal() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        let meal = plan(&db, d(2025, 10, 13), "lunch", recipe.id);
        assert!(db.delete_planned_meal(meal.id).unwrap());
        assert!(!db.delete_planned_meal(meal.id).unwrap());
        assert!(db.get_planned_meal(meal.id).is_err());
    }

    #[test]
    fn test_usages_for_date_range() {
        let db = Database::open_in_memory().unwrap();
        let recipe = soup(&db);
        plan(&db, d(2025, 10, 13), "lunch", recipe.id);
        plan(&db, d(2025, 10, 15), "dinner", recipe.id);
        plan(&db, d(2025, 10, 22), "dinner", recipe.id);

        let usages = db
            .usages_for_date_range(d(2025, 10, 13), d(2025, 10, 19))
            .unwrap();
        assert_eq!(usages.len(), 6);
        assert_eq!(usages[0], IngredientUsage::new("Potato", 800.0, Some(Unit::Gram)));
        assert_eq!(usages[1], IngredientUsage::new("Onion", 1.0, None));

        assert!(
            db.usages_for_date_range(d(2025, 11, 1), d(2025, 11, 7))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_preferences() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_preference("k").unwrap(), None);
        db.set_preference("k", "v1").unwrap();
        db.set_preference("k", "v2").unwrap();
        assert_eq!(db.get_preference("k").unwrap().as_deref(), Some("v2"));
        assert!(db.delete_preference("k").unwrap());
        assert!(!db.delete_preference("k").unwrap());
    }

    #[test]
    fn test_preferences_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        {
            let db = Database::open(&path).unwrap();
            db.put_string("checked_ingredients_2025-10-15", "[\"Apple\"]")
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get_string("checked_ingredients_2025-10-15")
                .unwrap()
                .as_deref(),
            Some("[\"Apple\"]")
        );
    }

    #[test]
    fn test_create_recipe_with_ingredients() {
        let db = Database::open_in_memory().unwrap();
        let detail = db
            .create_recipe_with_ingredients(
                "Mash",
                2.0,
                &[
                    IngredientUsage::new("Potato", 1.0, Some(Unit::Kilogram)),
                    IngredientUsage::new("Butter", 50.0, Some(Unit::Gram)),
                ],
            )
            .unwrap();
        assert_eq!(detail.name, "Mash");
        assert_eq!(detail.ingredients.len(), 2);
    }

    #[test]
    fn test_create_recipe_with_ingredients_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let lines = [
            IngredientUsage::new("Potato", 1.0, Some(Unit::Kilogram)),
            IngredientUsage::new("   ", 1.0, None),
        ];
        let err = db
            .create_recipe_with_ingredients("Mash", 2.0, &lines)
            .unwrap_err();
        assert!(format!("{err:#}").contains("Ingredient name must not be empty"));
        assert!(db.find_recipe_by_name("Mash").unwrap().is_none());
        assert!(db.list_ingredients(None).unwrap().is_empty());

        // A corrected retry is not blocked by leftovers
        let detail = db
            .create_recipe_with_ingredients("Mash", 2.0, &lines[..1])
            .unwrap();
        assert_eq!(detail.ingredients.len(), 1);
    }
}
