use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::checked::{CheckedStateStore, Clock};
use crate::grocery::{aggregate, apply_checked, normalize_usages};
use crate::models::{AggregatedIngredient, IngredientUsage};
use crate::store::KeyValueStore;
use crate::week::{week_anchor, week_bounds};

/// Supplies the ingredient usages of every meal planned in a date range.
///
/// [`Database`](crate::db::Database) implements this over the stored meal
/// plan; tests substitute fixed lists.
pub trait MealDataProvider {
    fn usages_for_date_range(&self, from: NaiveDate, to: NaiveDate)
    -> Result<Vec<IngredientUsage>>;
}

impl<T: MealDataProvider + ?Sized> MealDataProvider for &T {
    fn usages_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<IngredientUsage>> {
        (**self).usages_for_date_range(from, to)
    }
}

impl MealDataProvider for Vec<IngredientUsage> {
    fn usages_for_date_range(&self, _: NaiveDate, _: NaiveDate) -> Result<Vec<IngredientUsage>> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroceryList {
    pub week_offset: i32,
    pub anchor: NaiveDate,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub items: Vec<AggregatedIngredient>,
}

impl GroceryList {
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_checked).count()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.len() - self.checked_count()
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AggregatedIngredient> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// Builds week-scoped grocery lists from the meal plan and records what has
/// already been bought.
pub struct GroceryPlanner<P, S, C> {
    provider: P,
    checked: CheckedStateStore<S, C>,
}

impl<P: MealDataProvider, S: KeyValueStore, C: Clock> GroceryPlanner<P, S, C> {
    pub fn new(provider: P, store: S, clock: C) -> Self {
        Self {
            provider,
            checked: CheckedStateStore::new(store, clock),
        }
    }

    /// Build the list for one week. "Today" is read once, so the date range
    /// and the checked set always describe the same week.
    pub fn grocery_list(&self, week_offset: i32) -> Result<GroceryList> {
        let today = self.checked.today();
        let anchor = week_anchor(week_offset, today)?;
        let (from, to) = week_bounds(week_offset, today)?;
        let usages = self
            .provider
            .usages_for_date_range(from, to)
            .with_context(|| format!("Failed to load planned meals for {from}..{to}"))?;
        let usage_count = usages.len();

        let mut items = aggregate(&normalize_usages(usages));
        let checked: BTreeSet<String> = self.checked.checked_names_at(anchor);
        apply_checked(&mut items, &checked);

        debug!(
            week_offset,
            %from,
            %to,
            usages = usage_count,
            items = items.len(),
            "built grocery list"
        );

        Ok(GroceryList {
            week_offset,
            anchor,
            from,
            to,
            items,
        })
    }

    pub fn set_checked(&self, name: &str, week_offset: i32, checked: bool) -> Result<()> {
        self.checked.set_checked(name, week_offset, checked)
    }

    pub fn toggle(&self, name: &str, week_offset: i32) -> Result<bool> {
        self.checked.toggle(name, week_offset)
    }

    pub fn clear_week(&self, week_offset: i32) -> Result<usize> {
        self.checked.clear_week(week_offset)
    }
}
