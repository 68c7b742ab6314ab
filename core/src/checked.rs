use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::store::KeyValueStore;
use crate::week::week_anchor;

const KEY_PREFIX: &str = "checked_ingredients";

/// Source of "today" for week-relative lookups.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Persisted per-week set of ingredient names the user has ticked off.
///
/// Each week is stored under `checked_ingredients_<anchor>` as a JSON array of
/// names, where the anchor is the Wednesday of that week. Unreadable or
/// malformed values are treated as "nothing checked". Old weeks are never
/// expired.
pub struct CheckedStateStore<S, C = SystemClock> {
    store: S,
    clock: C,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore, C: Clock> CheckedStateStore<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn week_anchor(&self, week_offset: i32) -> Result<NaiveDate> {
        week_anchor(week_offset, self.clock.today())
    }

    #[must_use]
    pub fn key_for(anchor: NaiveDate) -> String {
        format!("{KEY_PREFIX}_{}", anchor.format("%Y-%m-%d"))
    }

    /// Names checked for the week `week_offset` weeks from today. Only an
    /// out-of-range offset fails; unreadable state reads as empty.
    pub fn checked_names(&self, week_offset: i32) -> Result<BTreeSet<String>> {
        Ok(self.checked_names_at(self.week_anchor(week_offset)?))
    }

    /// Names checked for the week identified by `anchor`.
    pub fn checked_names_at(&self, anchor: NaiveDate) -> BTreeSet<String> {
        self.load(&Self::key_for(anchor))
    }

    pub fn is_checked(&self, name: &str, week_offset: i32) -> Result<bool> {
        Ok(self.checked_names(week_offset)?.contains(name))
    }

    pub fn mark_checked(&self, name: &str, week_offset: i32) -> Result<()> {
        self.update(week_offset, |names| {
            names.insert(name.to_string());
        })
    }

    pub fn mark_unchecked(&self, name: &str, week_offset: i32) -> Result<()> {
        self.update(week_offset, |names| {
            names.remove(name);
        })
    }

    pub fn set_checked(&self, name: &str, week_offset: i32, checked: bool) -> Result<()> {
        if checked {
            self.mark_checked(name, week_offset)
        } else {
            self.mark_unchecked(name, week_offset)
        }
    }

    /// Flip the checked state of `name`, returning the new state.
    pub fn toggle(&self, name: &str, week_offset: i32) -> Result<bool> {
        let mut now_checked = false;
        self.update(week_offset, |names| {
            now_checked = names.insert(name.to_string());
            if !now_checked {
                names.remove(name);
            }
        })?;
        Ok(now_checked)
    }

    /// Uncheck everything for one week, returning how many names were cleared.
    pub fn clear_week(&self, week_offset: i32) -> Result<usize> {
        let key = Self::key_for(self.week_anchor(week_offset)?);
        let _guard = self.guard();
        let cleared = self.load(&key).len();
        self.store
            .remove(&key)
            .with_context(|| format!("Failed to clear checked state for {key}"))?;
        debug!(key = %key, cleared, "cleared checked ingredients");
        Ok(cleared)
    }

    fn update(&self, week_offset: i32, edit: impl FnOnce(&mut BTreeSet<String>)) -> Result<()> {
        let key = Self::key_for(self.week_anchor(week_offset)?);
        let _guard = self.guard();
        let mut names = self.load(&key);
        let before = names.clone();
        edit(&mut names);
        if names == before {
            return Ok(());
        }
        let value = serde_json::to_string(&names)?;
        self.store
            .put_string(&key, &value)
            .with_context(|| format!("Failed to save checked state for {key}"))?;
        debug!(key = %key, count = names.len(), "saved checked ingredients");
        Ok(())
    }

    fn load(&self, key: &str) -> BTreeSet<String> {
        let raw = match self.store.get_string(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeSet::new(),
            Err(e) => {
                warn!(key, error = %e, "could not read checked state, treating as empty");
                return BTreeSet::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                warn!(key, error = %e, "malformed checked state, treating as empty");
                BTreeSet::new()
            }
        }
    }

    // A poisoned lock only means another writer panicked; the stored value is
    // still whole, so keep going.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
