use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::db::Database;
use larder_core::models::{NewPlannedMeal, validate_meal_type};
use larder_core::week::{week_bounds, week_offset_of};

use super::helpers::{json_error, parse_date, truncate};

pub(crate) fn cmd_plan_add(
    db: &Database,
    recipe_name: &str,
    meal: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let meal_type = validate_meal_type(meal)?;
    let recipe = db.get_recipe_by_name(recipe_name)?;

    let planned = db.plan_meal(&NewPlannedMeal {
        date,
        meal_type,
        recipe_id: recipe.id,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
    } else {
        let id = planned.id;
        let weekday = planned.date.format("%A");
        let offset = week_offset_of(planned.date, Local::now().date_naive());
        println!(
            "Planned {} for {} on {weekday} {} (id: {id}, week {offset:+})",
            planned.recipe_name, planned.meal_type, planned.date
        );
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove(db: &Database, id: i64, json: bool) -> Result<()> {
    if db.delete_planned_meal(id)? {
        if json {
            println!("{}", serde_json::json!({ "deleted": id }));
        } else {
            println!("Removed planned meal {id}");
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Planned meal {id} not found")));
        } else {
            eprintln!("Planned meal {id} not found");
        }
        process::exit(2);
    }
}

pub(crate) fn cmd_plan_show(db: &Database, week_offset: i32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
    }

    let (from, to) = week_bounds(week_offset, Local::now().date_naive())?;
    let meals = db.get_planned_meals(from, to)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "week_offset": week_offset,
                "from": from,
                "to": to,
                "meals": meals,
            }))?
        );
        return Ok(());
    }

    println!("Meal plan {from} .. {to}");
    if meals.is_empty() {
        println!("  Nothing planned. Add meals with: larder plan add <recipe> --date YYYY-MM-DD");
        return Ok(());
    }

    let rows: Vec<PlanRow> = meals
        .iter()
        .map(|m| PlanRow {
            id: m.id,
            day: m.date.format("%a").to_string(),
            date: m.date.format("%Y-%m-%d").to_string(),
            meal: m.meal_type.clone(),
            recipe: truncate(&m.recipe_name, 35),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
