use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};

/// Days from the start of an ISO week (Monday) to its anchor, Wednesday.
const ANCHOR_FROM_MONDAY: i64 = 2;

fn monday_of(date: NaiveDate) -> Option<NaiveDate> {
    let back = i64::from(date.weekday().num_days_from_monday());
    date.checked_sub_signed(Duration::days(back))
}

fn shifted_monday(week_offset: i32, today: NaiveDate) -> Option<NaiveDate> {
    today
        .checked_add_signed(Duration::weeks(i64::from(week_offset)))
        .and_then(monday_of)
}

/// The Wednesday of the ISO week `week_offset` weeks away from `today`.
///
/// Every day Monday through Sunday of a week resolves to the same anchor, so
/// the anchor works as a stable per-week storage key regardless of the
/// first-day-of-week a user prefers. Fails when the week lies outside the
/// representable calendar.
pub fn week_anchor(week_offset: i32, today: NaiveDate) -> Result<NaiveDate> {
    shifted_monday(week_offset, today)
        .and_then(|monday| monday.checked_add_signed(Duration::days(ANCHOR_FROM_MONDAY)))
        .with_context(|| format!("Week offset {week_offset} is out of range"))
}

/// Inclusive Monday..=Sunday range of the week `week_offset` weeks away.
pub fn week_bounds(week_offset: i32, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    shifted_monday(week_offset, today)
        .and_then(|monday| Some((monday, monday.checked_add_signed(Duration::days(6))?)))
        .with_context(|| format!("Week offset {week_offset} is out of range"))
}

/// Week offset of `date` relative to the week containing `today`.
// The calendar spans far fewer than i32::MAX weeks.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn week_offset_of(date: NaiveDate, today: NaiveDate) -> i32 {
    let monday = |d: NaiveDate| {
        i64::from(d.num_days_from_ce()) - i64::from(d.weekday().num_days_from_monday())
    };
    ((monday(date) - monday(today)) / 7) as i32
}
