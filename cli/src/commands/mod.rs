mod grocery;
mod helpers;
mod ingredient;
mod plan;
mod recipe;

use larder_core::checked::SystemClock;
use larder_core::db::Database;
use larder_core::service::GroceryPlanner;

pub(crate) use grocery::{
    cmd_grocery_clear, cmd_grocery_list, cmd_grocery_set_checked, cmd_grocery_shop,
};
pub(crate) use ingredient::cmd_ingredient_list;
pub(crate) use plan::{cmd_plan_add, cmd_plan_remove, cmd_plan_show};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_import,
    cmd_recipe_list, cmd_recipe_notes, cmd_recipe_remove_ingredient, cmd_recipe_set_servings,
    cmd_recipe_show,
};

/// The database serves both as the meal plan and as the checked-state store.
pub(crate) type Planner<'a> = GroceryPlanner<&'a Database, &'a Database, SystemClock>;

pub(crate) fn planner(db: &Database) -> Planner<'_> {
    GroceryPlanner::new(db, db, SystemClock)
}
