use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::work_entry::WorkEntry;

/// Totals for one calendar date. Derived on every read, never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_pieces: i64,
    pub total_salary: Decimal,
    /// Newest `created_at` first.
    pub entries: Vec<WorkEntry>,
}
