//! Groups work entries into per-date summaries.
//!
//! Everything here is pure: entries come in already loaded from an
//! `EntryStore`, summaries go out. Entries are bucketed by the `date` they
//! carry; nothing is re-derived from `created_at`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::summary::DailySummary;
use crate::models::work_entry::WorkEntry;

/// One summary per distinct date, most recent date first.
pub fn group_by_date<I>(entries: I) -> Vec<DailySummary>
where
    I: IntoIterator<Item = WorkEntry>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<WorkEntry>> = BTreeMap::new();
    for entry in entries {
        buckets.entry(entry.date).or_default().push(entry);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(date, bucket)| summarize(date, bucket))
        .collect()
}

/// Summary for `date`, or `None` when no entry carries that date.
pub fn summary_for_date<I>(entries: I, date: NaiveDate) -> Option<DailySummary>
where
    I: IntoIterator<Item = WorkEntry>,
{
    let matching: Vec<WorkEntry> = entries.into_iter().filter(|e| e.date == date).collect();
    if matching.is_empty() {
        return None;
    }
    Some(summarize(date, matching))
}

fn summarize(date: NaiveDate, mut entries: Vec<WorkEntry>) -> DailySummary {
    // Stable: equal timestamps keep their incoming order.
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total_pieces = entries.iter().map(|e| i64::from(e.pieces)).sum();
    // Stored totals are bounded; saturate anyway so foreign rows cannot panic.
    let total_salary = entries
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc.saturating_add(e.total));

    DailySummary {
        date,
        total_pieces,
        total_salary,
        entries,
    }
}
