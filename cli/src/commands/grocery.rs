use anyhow::{Result, bail};
use serde::Serialize;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::block_in_place;

use larder_core::checked::Clock;
use larder_core::service::{GroceryList, MealDataProvider};
use larder_core::state::{GroceryListModel, GroceryListState};
use larder_core::store::KeyValueStore;

use super::Planner;
use super::helpers::format_grocery_line;

pub(crate) fn cmd_grocery_list(planner: &Planner<'_>, week_offset: i32, json: bool) -> Result<()> {
    let list = planner.grocery_list(week_offset)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        print_list(&list);
    }
    Ok(())
}

/// Resolve user input (a 1-based number or a name) to an item on the list.
pub(crate) fn resolve_item<'a>(list: &'a GroceryList, input: &str) -> Result<&'a str> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| list.items.get(i)) {
            Some(item) => Ok(&item.name),
            None => bail!("No item #{n} (list has {} items)", list.items.len()),
        };
    }
    if let Some(item) = list.find(input) {
        return Ok(&item.name);
    }
    let matches: Vec<&str> = list
        .items
        .iter()
        .filter(|i| i.name.eq_ignore_ascii_case(input))
        .map(|i| i.name.as_str())
        .collect();
    match matches.as_slice() {
        [name] => Ok(*name),
        [] => bail!("'{input}' is not on the grocery list for this week"),
        _ => bail!("'{input}' is ambiguous: {}", matches.join(", ")),
    }
}

pub(crate) fn cmd_grocery_set_checked(
    planner: &Planner<'_>,
    items: &[String],
    week_offset: i32,
    checked: bool,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    struct Changed<'a> {
        name: &'a str,
        is_checked: bool,
    }

    let list = planner.grocery_list(week_offset)?;
    let names = items
        .iter()
        .map(|i| resolve_item(&list, i))
        .collect::<Result<Vec<_>>>()?;

    for name in &names {
        planner.set_checked(name, week_offset, checked)?;
    }

    if json {
        let changed: Vec<Changed> = names
            .iter()
            .map(|&name| Changed {
                name,
                is_checked: checked,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&changed)?);
    } else {
        let verb = if checked { "Checked" } else { "Unchecked" };
        for name in &names {
            println!("{verb} {name}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_grocery_clear(planner: &Planner<'_>, week_offset: i32, json: bool) -> Result<()> {
    let cleared = planner.clear_week(week_offset)?;
    if json {
        println!("{}", serde_json::json!({ "cleared": cleared, "week_offset": week_offset }));
    } else {
        println!("Unchecked {cleared} item(s) for week {week_offset:+}");
    }
    Ok(())
}

const SHOP_HELP: &str = "Commands: <number|name>... toggle, n next week, p previous week, \
c uncheck all, r refresh, ? help, q quit";

/// Interactive shopping session driven by the grocery list model.
pub(crate) async fn cmd_grocery_shop(planner: Planner<'_>, week_offset: i32) -> Result<()> {
    let model = GroceryListModel::new(planner);
    let mut updates = model.subscribe();

    if let Err(e) = block_in_place(|| model.load(week_offset)) {
        tracing::debug!(error = %e, "initial load failed");
    }
    eprintln!("{SHOP_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if updates.has_changed().unwrap_or(false) {
            render_state(&updates.borrow_and_update());
        }
        eprint!("> ");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let step = block_in_place(|| handle_shop_line(&model, &line, &mut io::stderr()))?;
        if step == ShopStep::Quit {
            break;
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ShopStep {
    Continue,
    Quit,
}

/// Run one line of shop input. Model failures land in the published state and
/// are rendered from there; only input mistakes are written to `out`.
fn handle_shop_line<P, S, C>(
    model: &GroceryListModel<P, S, C>,
    line: &str,
    out: &mut impl Write,
) -> io::Result<ShopStep>
where
    P: MealDataProvider,
    S: KeyValueStore,
    C: Clock,
{
    let line = line.trim();
    let outcome = match line {
        "" => Ok(()),
        "q" | "quit" | "exit" => return Ok(ShopStep::Quit),
        "?" | "h" | "help" => {
            writeln!(out, "{SHOP_HELP}")?;
            Ok(())
        }
        "n" => model.next_week(),
        "p" => model.previous_week(),
        "r" => model.refresh(),
        "c" => model.clear_checked().and_then(|n| {
            writeln!(out, "Unchecked {n} item(s)")?;
            Ok(())
        }),
        _ => match toggle_names(&model.snapshot(), line) {
            Ok(names) => names.iter().try_for_each(|name| model.toggle(name).map(|_| ())),
            Err(e) => {
                writeln!(out, "Error: {e:#}")?;
                Ok(())
            }
        },
    };
    if let Err(e) = outcome {
        tracing::debug!(error = %e, "shop command failed");
    }
    Ok(ShopStep::Continue)
}

/// Resolve a line of numbers (`1 3 4`) or a single name to list entries.
fn toggle_names(state: &GroceryListState, line: &str) -> Result<Vec<String>> {
    let Some(list) = state.list.as_ref() else {
        bail!("Grocery list not loaded");
    };
    let inputs: Vec<&str> = if line.split_whitespace().all(|t| t.parse::<usize>().is_ok()) {
        line.split_whitespace().collect()
    } else {
        vec![line]
    };
    inputs
        .iter()
        .map(|i| resolve_item(list, i).map(str::to_string))
        .collect()
}

fn render_state(state: &GroceryListState) {
    if let Some(error) = &state.error {
        eprintln!("Error: {error}");
    }
    if let Some(list) = &state.list {
        print_list(list);
    }
}

fn print_list(list: &GroceryList) {
    let offset = list.week_offset;
    println!(
        "Groceries for week {offset:+} ({} .. {})",
        list.from, list.to
    );
    if list.items.is_empty() {
        println!("  Nothing planned this week.");
        return;
    }
    for (i, item) in list.items.iter().enumerate() {
        println!("{}", format_grocery_line(i, item));
    }
    println!(
        "  {} of {} checked, {} to buy",
        list.checked_count(),
        list.items.len(),
        list.remaining()
    );
}
