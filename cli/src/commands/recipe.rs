use anyhow::{Context, Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};
use tracing::warn;

use larder_core::db::Database;
use larder_core::models::{IngredientUsage, Unit};

use super::helpers::{format_quantity, json_error, parse_quantity, truncate};

pub(crate) fn cmd_recipe_create(
    db: &Database,
    name: &str,
    servings: f64,
    json: bool,
) -> Result<()> {
    let recipe = db.create_recipe(name, servings)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let id = recipe.id;
        let name = &recipe.name;
        println!("Created recipe: {name} (id: {id}, servings: {servings})");
        println!("Add ingredients with: larder recipe add-ingredient \"{name}\" <ingredient> <quantity>");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add_ingredient(
    db: &Database,
    recipe_name: &str,
    ingredient_name: &str,
    quantity_str: &str,
    json: bool,
) -> Result<()> {
    let recipe = db.get_recipe_by_name(recipe_name)?;
    let (quantity, unit) = parse_quantity(quantity_str)?;
    let ingredient = db.add_recipe_ingredient(recipe.id, ingredient_name, quantity, unit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ingredient)?);
    } else {
        let qty = format_quantity(quantity, unit);
        let ingredient_name = &ingredient.ingredient_name;
        let recipe_name = &recipe.name;
        println!("Added {qty} of {ingredient_name} to {recipe_name}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    db: &Database,
    recipe_name: &str,
    ingredient_name: &str,
    json: bool,
) -> Result<()> {
    let recipe = db.get_recipe_by_name(recipe_name)?;
    if db.remove_recipe_ingredient(recipe.id, ingredient_name)? {
        if json {
            println!("{}", serde_json::json!({ "removed": ingredient_name }));
        } else {
            println!("Removed {ingredient_name} from {}", recipe.name);
        }
        Ok(())
    } else {
        if json {
            println!(
                "{}",
                json_error(&format!(
                    "Ingredient '{ingredient_name}' not found in recipe"
                ))
            );
        } else {
            eprintln!("Ingredient '{ingredient_name}' not found in recipe");
        }
        process::exit(2);
    }
}

pub(crate) fn cmd_recipe_set_servings(
    db: &Database,
    recipe_name: &str,
    servings: f64,
    json: bool,
) -> Result<()> {
    let recipe = db.get_recipe_by_name(recipe_name)?;
    db.set_recipe_servings(recipe.id, servings)?;
    if json {
        let detail = db.get_recipe_detail(recipe.id)?;
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        println!("Updated {} to {servings} servings", recipe.name);
    }
    Ok(())
}

/// Show a recipe's notes, or replace them when `text` is given. Blank text
/// and `clear` both remove the notes.
pub(crate) fn cmd_recipe_notes(
    db: &Database,
    recipe_name: &str,
    text: Option<&str>,
    clear: bool,
    json: bool,
) -> Result<()> {
    let recipe = db.get_recipe_by_name(recipe_name)?;
    let name = &recipe.name;

    let notes = match (text, clear) {
        (Some(_), true) => bail!("Pass either new notes or --clear, not both"),
        (None, false) => recipe.notes.clone(),
        (text, _) => {
            let notes = text.map(str::trim).filter(|t| !t.is_empty());
            db.set_recipe_notes(recipe.id, notes)?;
            notes.map(String::from)
        }
    };

    if json {
        println!("{}", serde_json::json!({ "recipe": name, "notes": notes }));
    } else if let Some(notes) = &notes {
        println!("{name}: {notes}");
    } else {
        println!("{name} has no notes");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(db: &Database, recipe_name: &str, json: bool) -> Result<()> {
    let recipe = db.get_recipe_by_name(recipe_name)?;
    let detail = db.get_recipe_detail(recipe.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let name = &detail.name;
    let servings = detail.servings;
    println!("=== {name} ===");
    println!("  Servings: {servings}\n");

    println!("  INGREDIENTS:");
    if detail.ingredients.is_empty() {
        println!("    (none)");
    }
    for ing in &detail.ingredients {
        let qty = format_quantity(ing.quantity, ing.unit);
        println!("    {} — {qty}", ing.ingredient_name);
    }

    if let Some(notes) = &detail.notes {
        println!("\n  NOTES:\n    {notes}");
    }

    Ok(())
}

pub(crate) fn cmd_recipe_list(db: &Database, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Servings")]
        servings: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let recipes = db.list_recipes()?;
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 30),
            servings: format!("{}", r.servings),
            ingredients: r.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recipe_delete(db: &Database, recipe_name: &str, json: bool) -> Result<()> {
    let recipe = db.get_recipe_by_name(recipe_name)?;
    db.delete_recipe(recipe.id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.id }));
    } else {
        println!("Deleted recipe {} (and its planned meals)", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_import(
    db: &Database,
    file: &std::path::Path,
    name_override: Option<String>,
    servings_override: Option<f64>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let (recipe_data, _report) = cooklang::parse(&input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let name = name_override
        .or_else(|| recipe_data.metadata.title().map(String::from))
        .or_else(|| file.file_stem().and_then(|s| s.to_str()).map(String::from))
        .context("Could not determine recipe name. Use --name to specify one")?;

    let servings = servings_override
        .or_else(|| {
            recipe_data
                .metadata
                .servings()
                .and_then(|s| s.as_number().map(f64::from))
        })
        .unwrap_or(1.0);

    let converter = cooklang::Converter::default();
    let grouped = recipe_data.group_ingredients(&converter);

    let ingredients: Vec<IngredientUsage> = grouped
        .iter()
        .flat_map(|gi| cooklang_ingredient_lines(gi))
        .collect();

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let detail = db.create_recipe_with_ingredients(&name, servings, &ingredients)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        let rname = &detail.name;
        let ing_count = detail.ingredients.len();
        let rservings = detail.servings;
        println!("Imported recipe: {rname} ({ing_count} ingredient lines, {rservings} servings)");
    }

    Ok(())
}

/// One line per distinct unit the ingredient is used with. An ingredient with
/// no quantity at all ("salt to taste") becomes a single unitless count of 1.
fn cooklang_ingredient_lines(
    gi: &cooklang::ingredient_list::GroupedIngredient<'_>,
) -> Vec<IngredientUsage> {
    let name = gi.ingredient.display_name().to_string();

    let mut lines: Vec<IngredientUsage> = gi
        .quantity
        .iter()
        .map(|qty: &cooklang::Quantity| {
            let quantity = match qty.value() {
                cooklang::Value::Number(n) => n.value(),
                cooklang::Value::Range { start, .. } => start.value(),
                cooklang::Value::Text(t) => t.trim().parse::<f64>().unwrap_or(1.0),
            };
            let unit = qty.unit().and_then(|u| {
                let parsed = Unit::parse(u);
                if parsed.is_none() {
                    warn!(ingredient = %name, unit = u, "unknown unit, importing as a plain count");
                }
                parsed
            });
            IngredientUsage::new(name.clone(), quantity, unit)
        })
        .collect();

    if lines.is_empty() {
        lines.push(IngredientUsage::new(name, 1.0, None));
    }
    lines
}
