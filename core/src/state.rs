use anyhow::{Context, Result, bail};
use tokio::sync::watch;

use crate::checked::Clock;
use crate::service::{GroceryList, GroceryPlanner, MealDataProvider};
use crate::store::KeyValueStore;

/// Snapshot of the grocery screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroceryListState {
    pub week_offset: i32,
    pub list: Option<GroceryList>,
    pub error: Option<String>,
}

/// Owner and only writer of [`GroceryListState`].
///
/// Every operation runs against the planner, updates the state in place and
/// notifies subscribers through a `watch` channel. Storage calls are blocking;
/// async callers should run them via `spawn_blocking`/`block_in_place`.
pub struct GroceryListModel<P, S, C> {
    planner: GroceryPlanner<P, S, C>,
    state: watch::Sender<GroceryListState>,
}

impl<P: MealDataProvider, S: KeyValueStore, C: Clock> GroceryListModel<P, S, C> {
    pub fn new(planner: GroceryPlanner<P, S, C>) -> Self {
        let (state, _) = watch::channel(GroceryListState::default());
        Self { planner, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<GroceryListState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> GroceryListState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn week_offset(&self) -> i32 {
        self.state.borrow().week_offset
    }

    pub fn load(&self, week_offset: i32) -> Result<()> {
        let result = self.planner.grocery_list(week_offset);
        self.publish(week_offset, result)
    }

    pub fn refresh(&self) -> Result<()> {
        self.load(self.week_offset())
    }

    pub fn next_week(&self) -> Result<()> {
        self.step_week(1)
    }

    pub fn previous_week(&self) -> Result<()> {
        self.step_week(-1)
    }

    fn step_week(&self, delta: i32) -> Result<()> {
        let current = self.week_offset();
        match current
            .checked_add(delta)
            .with_context(|| format!("No week beyond offset {current}"))
        {
            Ok(week_offset) => self.load(week_offset),
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Flip one ingredient for the current week, returning its new state.
    pub fn toggle(&self, name: &str) -> Result<bool> {
        let week_offset = self.week_offset();
        match self.planner.toggle(name, week_offset) {
            Ok(checked) => {
                self.refresh()?;
                Ok(checked)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Toggle by zero-based position in the current list.
    pub fn toggle_index(&self, index: usize) -> Result<(String, bool)> {
        let name = {
            let state = self.state.borrow();
            let Some(list) = state.list.as_ref() else {
                bail!("Grocery list not loaded");
            };
            match list.items.get(index) {
                Some(item) => item.name.clone(),
                None => bail!(
                    "No item #{} (list has {} items)",
                    index + 1,
                    list.items.len()
                ),
            }
        };
        let checked = self.toggle(&name)?;
        Ok((name, checked))
    }

    pub fn clear_checked(&self) -> Result<usize> {
        let week_offset = self.week_offset();
        match self.planner.clear_week(week_offset) {
            Ok(cleared) => {
                self.refresh()?;
                Ok(cleared)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn publish(&self, week_offset: i32, result: Result<GroceryList>) -> Result<()> {
        match result {
            Ok(list) => {
                self.state.send_replace(GroceryListState {
                    week_offset,
                    list: Some(list),
                    error: None,
                });
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|s| {
                    s.week_offset = week_offset;
                    s.list = None;
                    s.error = Some(format!("{e:#}"));
                });
                Err(e)
            }
        }
    }

    fn record_error(&self, e: &anyhow::Error) {
        self.state.send_modify(|s| s.error = Some(format!("{e:#}")));
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::NaiveDate;

    use super::*;
    use crate::checked::FixedClock;
    use crate::models::{IngredientUsage, Unit};
    use crate::store::MemoryStore;

    fn model() -> GroceryListModel<Vec<IngredientUsage>, MemoryStore, FixedClock> {
        let usages = vec![
            IngredientUsage::new("Potato", 1.0, Some(Unit::Kilogram)),
            IngredientUsage::new("Tomato", 3.0, None),
            IngredientUsage::new("Onion", 2.0, None),
        ];
        GroceryListModel::new(GroceryPlanner::new(
            usages,
            MemoryStore::new(),
            FixedClock(NaiveDate::from_ymd_opt(2025, 10, 11).unwrap()),
        ))
    }

    struct FailingProvider;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get_string(&self, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn put_string(&self, _: &str, _: &str) -> Result<()> {
            Err(anyhow!("store is read-only"))
        }

        fn remove(&self, _: &str) -> Result<bool> {
            Err(anyhow!("store is read-only"))
        }
    }

    impl MealDataProvider for FailingProvider {
        fn usages_for_date_range(
            &self,
            _: NaiveDate,
            _: NaiveDate,
        ) -> Result<Vec<IngredientUsage>> {
            Err(anyhow!("meal plan unavailable"))
        }
    }

    #[test]
    fn test_initial_state_empty() {
        let model = model();
        let state = model.snapshot();
        assert_eq!(state.week_offset, 0);
        assert!(state.list.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_load_and_navigate() {
        let model = model();
        model.load(0).unwrap();
        assert_eq!(model.snapshot().list.unwrap().items.len(), 3);

        model.next_week().unwrap();
        model.next_week().unwrap();
        model.previous_week().unwrap();
        let state = model.snapshot();
        assert_eq!(state.week_offset, 1);
        assert_eq!(state.list.unwrap().week_offset, 1);
    }

    #[test]
    fn test_toggle_index_updates_state() {
        let model = model();
        model.load(0).unwrap();
        // Sorted: Onion, Potato, Tomato
        let (name, checked) = model.toggle_index(1).unwrap();
        assert_eq!(name, "Potato");
        assert!(checked);
        let list = model.snapshot().list.unwrap();
        assert!(list.find("Potato").unwrap().is_checked);
        assert_eq!(list.checked_count(), 1);

        assert!(model.toggle_index(7).is_err());
    }

    #[test]
    fn test_toggle_index_requires_load() {
        let model = model();
        assert!(model.toggle_index(0).is_err());
    }

    #[test]
    fn test_clear_checked() {
        let model = model();
        model.load(0).unwrap();
        model.toggle("Onion").unwrap();
        model.toggle("Tomato").unwrap();
        assert_eq!(model.clear_checked().unwrap(), 2);
        assert_eq!(model.snapshot().list.unwrap().checked_count(), 0);
    }

    #[test]
    fn test_provider_error_captured_in_state() {
        let model = GroceryListModel::new(GroceryPlanner::new(
            FailingProvider,
            MemoryStore::new(),
            FixedClock(NaiveDate::from_ymd_opt(2025, 10, 11).unwrap()),
        ));
        assert!(model.load(2).is_err());
        let state = model.snapshot();
        assert_eq!(state.week_offset, 2);
        assert!(state.list.is_none());
        assert!(state.error.unwrap().contains("meal plan unavailable"));
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let model = model();
        let mut rx = model.subscribe();
        assert!(rx.borrow_and_update().list.is_none());

        model.load(0).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().list.as_ref().unwrap().items.len(), 3);

        model.toggle("Tomato").unwrap();
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update();
        assert!(state.list.as_ref().unwrap().find("Tomato").unwrap().is_checked);
    }

    #[test]
    fn test_navigation_past_last_week_is_an_error() {
        let model = model();
        assert!(model.load(i32::MAX).is_err());
        assert_eq!(model.week_offset(), i32::MAX);

        let err = model.next_week().unwrap_err();
        assert!(err.to_string().contains("No week beyond"));
        let state = model.snapshot();
        assert_eq!(state.week_offset, i32::MAX);
        assert!(state.error.is_some());

        // Stepping back still works from the failed position
        assert!(model.previous_week().is_err());
        assert_eq!(model.week_offset(), i32::MAX - 1);
        model.load(0).unwrap();
        assert!(model.snapshot().error.is_none());
    }

    #[test]
    fn test_toggle_failure_recorded_once_in_state() {
        let model = GroceryListModel::new(GroceryPlanner::new(
            vec![IngredientUsage::new("Tomato", 3.0, None)],
            ReadOnlyStore,
            FixedClock(NaiveDate::from_ymd_opt(2025, 10, 11).unwrap()),
        ));
        model.load(0).unwrap();
        assert!(model.toggle("Tomato").is_err());
        let state = model.snapshot();
        assert!(state.error.unwrap().contains("read-only"));
        assert!(!state.list.unwrap().find("Tomato").unwrap().is_checked);
    }
}
