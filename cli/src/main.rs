mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_grocery_clear, cmd_grocery_list, cmd_grocery_set_checked, cmd_grocery_shop,
    cmd_ingredient_list, cmd_plan_add, cmd_plan_remove, cmd_plan_show, cmd_recipe_add_ingredient,
    cmd_recipe_create, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list, cmd_recipe_notes,
    cmd_recipe_remove_ingredient, cmd_recipe_set_servings, cmd_recipe_show, planner,
};
use crate::config::Config;
use larder_core::db::Database;

/// Log filter, e.g. `LARDER_LOG=larder_core=debug`.
const LOG_ENV: &str = "LARDER_LOG";

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "Plan meals by the week and shop from one grocery list"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage recipes and their ingredients
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Browse known ingredients
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Plan meals by day
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Build and tick off the weekly grocery list
    Grocery {
        #[command(subcommand)]
        command: GroceryCommands,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Number of servings this recipe makes
        #[arg(short, long, default_value = "1")]
        servings: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe
    AddIngredient {
        /// Recipe name
        recipe: String,
        /// Ingredient name
        ingredient: String,
        /// Quantity (e.g. "3", "500g", "2 tbsp", "1 l")
        quantity: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe name
        recipe: String,
        /// Ingredient name to remove
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the number of servings for a recipe
    SetServings {
        /// Recipe name
        recipe: String,
        /// New number of servings
        servings: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or replace a recipe's notes
    Notes {
        /// Recipe name
        recipe: String,
        /// New notes (omit to show the current ones)
        text: Option<String>,
        /// Remove the notes
        #[arg(long)]
        clear: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recipe details
    Show {
        /// Recipe name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe and every meal planned with it
    Delete {
        /// Recipe name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: std::path::PathBuf,
        /// Recipe name override (defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Servings override (defaults to metadata servings)
        #[arg(long)]
        servings: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// List ingredients used by any recipe
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Plan a recipe for a meal
    Add {
        /// Recipe name
        recipe: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a planned meal by ID
    Remove {
        /// Planned meal ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the meal plan for a week
    Show {
        /// Week relative to this one (0 = this week, 1 = next, -1 = last)
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        week: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GroceryCommands {
    /// Show the grocery list for a week
    List {
        /// Week relative to this one (0 = this week, 1 = next, -1 = last)
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        week: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark items as bought (by name or list number)
    Check {
        /// Item names or list numbers
        #[arg(required = true)]
        items: Vec<String>,
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        week: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark items as not bought
    Uncheck {
        /// Item names or list numbers
        #[arg(required = true)]
        items: Vec<String>,
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        week: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Uncheck every item for a week
    Clear {
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        week: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive shopping session
    Shop {
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        week: i32,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;

    match cli.command {
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                name,
                servings,
                json,
            } => cmd_recipe_create(&db, &name, servings, json),
            RecipeCommands::AddIngredient {
                recipe,
                ingredient,
                quantity,
                json,
            } => cmd_recipe_add_ingredient(&db, &recipe, &ingredient, &quantity, json),
            RecipeCommands::RemoveIngredient {
                recipe,
                ingredient,
                json,
            } => cmd_recipe_remove_ingredient(&db, &recipe, &ingredient, json),
            RecipeCommands::SetServings {
                recipe,
                servings,
                json,
            } => cmd_recipe_set_servings(&db, &recipe, servings, json),
            RecipeCommands::Notes {
                recipe,
                text,
                clear,
                json,
            } => cmd_recipe_notes(&db, &recipe, text.as_deref(), clear, json),
            RecipeCommands::Show { recipe, json } => cmd_recipe_show(&db, &recipe, json),
            RecipeCommands::List { json } => cmd_recipe_list(&db, json),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&db, &recipe, json),
            RecipeCommands::Import {
                file,
                name,
                servings,
                json,
            } => cmd_recipe_import(&db, &file, name, servings, json),
        },
        Commands::Ingredient { command } => match command {
            IngredientCommands::List { search, json } => {
                cmd_ingredient_list(&db, search.as_deref(), json)
            }
        },
        Commands::Plan { command } => match command {
            PlanCommands::Add {
                recipe,
                meal,
                date,
                json,
            } => cmd_plan_add(&db, &recipe, &meal, date, json),
            PlanCommands::Remove { id, json } => cmd_plan_remove(&db, id, json),
            PlanCommands::Show { week, json } => cmd_plan_show(&db, week, json),
        },
        Commands::Grocery { command } => match command {
            GroceryCommands::List { week, json } => cmd_grocery_list(&planner(&db), week, json),
            GroceryCommands::Check { items, week, json } => {
                cmd_grocery_set_checked(&planner(&db), &items, week, true, json)
            }
            GroceryCommands::Uncheck { items, week, json } => {
                cmd_grocery_set_checked(&planner(&db), &items, week, false, json)
            }
            GroceryCommands::Clear { week, json } => cmd_grocery_clear(&planner(&db), week, json),
            GroceryCommands::Shop { week } => cmd_grocery_shop(planner(&db), week).await,
        },
    }
}
