use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AggregatedIngredient, IngredientUsage, UnitAmount};

/// Group usages by ingredient name, then by unit, summing quantities.
///
/// Names are compared exactly (no trimming or case folding) and the result is
/// sorted by name. Within an entry, units appear in the order they were first
/// seen. Units are never converted into one another here; see
/// [`normalize_usages`] for the step that folds metric units together.
#[must_use]
pub fn aggregate(usages: &[IngredientUsage]) -> Vec<AggregatedIngredient> {
    let mut groups: BTreeMap<&str, Vec<UnitAmount>> = BTreeMap::new();

    for usage in usages {
        let amounts = groups.entry(usage.ingredient_name.as_str()).or_default();
        match amounts.iter_mut().find(|a| a.unit == usage.unit) {
            Some(amount) => amount.total += usage.quantity,
            None => amounts.push(UnitAmount {
                unit: usage.unit,
                total: usage.quantity,
            }),
        }
    }

    groups
        .into_iter()
        .map(|(name, amounts_by_unit)| AggregatedIngredient {
            name: name.to_string(),
            amounts_by_unit,
            is_checked: false,
        })
        .collect()
}

/// Rewrite each usage into its unit's canonical form (grams to kilograms,
/// millilitres to litres) so that [`aggregate`] can sum them together.
#[must_use]
pub fn normalize_usages(usages: Vec<IngredientUsage>) -> Vec<IngredientUsage> {
    usages
        .into_iter()
        .map(|mut usage| {
            if let Some(unit) = usage.unit {
                let (canonical, quantity) = unit.to_canonical(usage.quantity);
                usage.unit = Some(canonical);
                usage.quantity = quantity;
            }
            usage
        })
        .collect()
}

/// Mark the entries whose names appear in `checked`. Entries are neither
/// added nor removed.
pub fn apply_checked(items: &mut [AggregatedIngredient], checked: &BTreeSet<String>) {
    for item in items {
        item.is_checked = checked.contains(&item.name);
    }
}
