//! Reminder statistics for `/reminder-stats`.

use crate::reminders::Reminder;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderStats {
    pub active: usize,
    pub completed_today: usize,
    pub streak: u32,
}

/// Consecutive-day run ending at the most recent completion date.
/// Several completions on one day count once.
pub fn compute_streak<I>(dates: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let distinct: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut newest_first = distinct.into_iter().rev();
    let Some(mut last) = newest_first.next() else {
        return 0;
    };
    let mut streak = 1;
    for date in newest_first {
        if last.pred_opt() != Some(date) {
            break;
        }
        streak += 1;
        last = date;
    }
    streak
}

/// Stats over the board's reminders; `today` is the local calendar date.
pub fn summarize(reminders: &[Reminder], today: NaiveDate) -> ReminderStats {
    let completion_dates: Vec<NaiveDate> = reminders
        .iter()
        .filter(|r| r.completed)
        .filter_map(|r| r.completed_at.map(|at| at.date_naive()))
        .collect();
    ReminderStats {
        active: reminders.iter().filter(|r| !r.completed).count(),
        completed_today: completion_dates.iter().filter(|d| **d == today).count(),
        streak: compute_streak(completion_dates),
    }
}
