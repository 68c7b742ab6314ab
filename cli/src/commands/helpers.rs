use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use larder_core::models::{AggregatedIngredient, Unit, UnitAmount};

/// Parse an ingredient quantity with an optional unit.
/// Accepts: "3", "200g", "500 ml", "2 tbsp", "1.5kg".
pub(crate) fn parse_quantity(s: &str) -> Result<(f64, Option<Unit>)> {
    let s = s.trim();

    if let Ok(qty) = s.parse::<f64>() {
        return positive(qty, s).map(|q| (q, None));
    }

    // "N<unit>" with no space (e.g. "500ml", "2tbsp")
    if let Some((qty, unit)) = split_number_unit(s) {
        let unit: Unit = unit.parse()?;
        return positive(qty, s).map(|q| (q, Some(unit)));
    }

    // "<number> <unit>"
    let parts: Vec<&str> = s.splitn(2, char::is_whitespace).collect();
    if parts.len() == 2 {
        let qty: f64 = parts[0]
            .parse()
            .with_context(|| format!("Invalid quantity: '{s}'"))?;
        let unit: Unit = parts[1].trim().parse()?;
        return positive(qty, s).map(|q| (q, Some(unit)));
    }

    bail!("Invalid quantity format: '{s}'. Use '3', '200g', '500 ml', '2 tbsp', etc.")
}

fn positive(qty: f64, s: &str) -> Result<f64> {
    if qty.is_finite() && qty > 0.0 {
        Ok(qty)
    } else {
        bail!("Quantity must be greater than 0 (got '{s}')")
    }
}

/// Split "500ml" or "2.5tbsp" into (500.0, "ml") or (2.5, "tbsp").
fn split_number_unit(s: &str) -> Option<(f64, &str)> {
    let idx = s.find(|c: char| c.is_alphabetic())?;
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    let qty: f64 = num_part.trim().parse().ok()?;
    if unit_part.is_empty() {
        return None;
    }
    Some((qty, unit_part))
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Format a number without trailing zeros, at most two decimals.
pub(crate) fn format_number(v: f64) -> String {
    let s = format!("{:.2}", no_neg_zero(v));
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

pub(crate) fn format_quantity(quantity: f64, unit: Option<Unit>) -> String {
    let n = format_number(quantity);
    match unit {
        Some(unit) => format!("{n} {unit}"),
        None => n,
    }
}

pub(crate) fn format_amounts(amounts: &[UnitAmount]) -> String {
    amounts
        .iter()
        .map(|a| format_quantity(a.total, a.unit))
        .collect::<Vec<_>>()
        .join(" + ")
}

pub(crate) fn format_grocery_line(index: usize, item: &AggregatedIngredient) -> String {
    let mark = if item.is_checked { "x" } else { " " };
    let amounts = format_amounts(&item.amounts_by_unit);
    format!("{:>3}. [{mark}] {} — {amounts}", index + 1, item.name)
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
