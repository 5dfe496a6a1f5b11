use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Work period an entry was logged for. Not an authentication session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkSession {
    Morning,
    Evening,
}

impl WorkSession {
    /// Lower-cased form used in persisted rows.
    pub fn as_row_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }
}

impl Default for WorkSession {
    fn default() -> Self {
        Self::Morning
    }
}

impl fmt::Display for WorkSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morning => f.write_str("Morning"),
            Self::Evening => f.write_str("Evening"),
        }
    }
}

impl FromStr for WorkSession {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("morning") {
            Ok(Self::Morning)
        } else if s.eq_ignore_ascii_case("evening") {
            Ok(Self::Evening)
        } else {
            Err(format!("unknown work session '{}'", s))
        }
    }
}

/// Upper bound on `pieces` for a single entry.
pub const MAX_PIECES: i32 = 1_000_000;

/// Upper bound on `rate_per_piece`. With `MAX_PIECES` this keeps a single
/// total under 10^12, so no product or daily sum can leave `Decimal` range.
pub const MAX_RATE_PER_PIECE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// `pieces * rate`, or `None` when the product does not fit a `Decimal`.
pub fn entry_total(pieces: i32, rate_per_piece: Decimal) -> Option<Decimal> {
    Decimal::from(pieces).checked_mul(rate_per_piece)
}

/// One logged work session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub pieces: i32,
    pub rate_per_piece: Decimal,
    pub total: Decimal,
    pub session: WorkSession,
    pub created_at: DateTime<Utc>,
    /// Grouping key: the UTC calendar date of `created_at`.
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl WorkEntry {
    /// Builds an unsaved entry. `total` and `date` are derived here and
    /// nowhere else. A total that overflows saturates to `Decimal::MAX`,
    /// which `save` then rejects.
    pub fn new(
        pieces: i32,
        rate_per_piece: Decimal,
        session: WorkSession,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            pieces,
            rate_per_piece,
            total: entry_total(pieces, rate_per_piece).unwrap_or(Decimal::MAX),
            session,
            created_at,
            date: created_at.date_naive(),
            user_id: None,
        }
    }
}

/// Persisted shape of a work entry, shared by every store backend.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WorkEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pieces: i32,
    pub rate: Decimal,
    pub total: Decimal,
    pub session: String,
    pub timestamp: DateTime<Utc>,
}

impl WorkEntryRow {
    pub fn from_entry(id: Uuid, user_id: Uuid, entry: &WorkEntry) -> Self {
        Self {
            id,
            user_id,
            pieces: entry.pieces,
            rate: entry.rate_per_piece,
            total: entry.total,
            session: entry.session.as_row_str().to_string(),
            timestamp: entry.created_at,
        }
    }
}

impl TryFrom<WorkEntryRow> for WorkEntry {
    type Error = String;

    fn try_from(row: WorkEntryRow) -> Result<Self, Self::Error> {
        let session = row
            .session
            .parse::<WorkSession>()
            .map_err(|e| format!("row {}: {}", row.id, e))?;

        Ok(Self {
            id: Some(row.id),
            pieces: row.pieces,
            rate_per_piece: row.rate,
            total: row.total,
            session,
            created_at: row.timestamp,
            date: row.timestamp.date_naive(),
            user_id: Some(row.user_id),
        })
    }
}

/// POST /api/entries
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkEntryRequest {
    #[validate(range(min = 1, max = 1000000, message = "pieces must be between 1 and 1000000"))]
    pub pieces: i32,

    #[validate(custom = "validate_positive_rate")]
    pub rate_per_piece: Decimal,

    #[serde(default)]
    pub session: WorkSession,

    /// Defaults to the time the server receives the request.
    pub created_at: Option<DateTime<Utc>>,
}

impl CreateWorkEntryRequest {
    pub fn into_entry(self, now: DateTime<Utc>) -> WorkEntry {
        WorkEntry::new(
            self.pieces,
            self.rate_per_piece,
            self.session,
            self.created_at.unwrap_or(now),
        )
    }
}

fn validate_positive_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if !rate.is_sign_positive() || rate.is_zero() {
        let mut err = ValidationError::new("positive");
        err.message = Some("ratePerPiece must be greater than zero".into());
        return Err(err);
    }
    if *rate > MAX_RATE_PER_PIECE {
        let mut err = ValidationError::new("max");
        err.message = Some(format!("ratePerPiece must be at most {}", MAX_RATE_PER_PIECE).into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_new_entry_derives_total_and_date() {
        let entry = WorkEntry::new(10, Decimal::new(525, 2), WorkSession::Evening, at(2024, 1, 2, 23));
        assert_eq!(entry.total, Decimal::new(5250, 2));
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(entry.id.is_none());
        assert!(entry.user_id.is_none());
    }

    #[test]
    fn test_row_mapping_lowercases_session() {
        let entry = WorkEntry::new(3, Decimal::from(10), WorkSession::Evening, at(2024, 1, 1, 10));
        let row = WorkEntryRow::from_entry(Uuid::new_v4(), Uuid::new_v4(), &entry);
        assert_eq!(row.session, "evening");
        assert_eq!(row.rate, Decimal::from(10));
        assert_eq!(row.timestamp, entry.created_at);
    }

    #[test]
    fn test_row_to_entry_rederives_date_from_timestamp() {
        let row = WorkEntryRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            pieces: 4,
            rate: Decimal::from(5),
            total: Decimal::from(20),
            session: "morning".into(),
            timestamp: at(2024, 1, 2, 0),
        };
        let entry = WorkEntry::try_from(row.clone()).unwrap();
        assert_eq!(entry.id, Some(row.id));
        assert_eq!(entry.user_id, Some(row.user_id));
        assert_eq!(entry.session, WorkSession::Morning);
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_row_with_unknown_session_is_rejected() {
        let row = WorkEntryRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            pieces: 1,
            rate: Decimal::ONE,
            total: Decimal::ONE,
            session: "night".into(),
            timestamp: at(2024, 1, 2, 0),
        };
        assert!(WorkEntry::try_from(row).is_err());
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = WorkEntry::new(2, Decimal::from(5), WorkSession::Morning, at(2024, 1, 2, 9));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["ratePerPiece"], "5");
        assert_eq!(json["session"], "Morning");
        assert_eq!(json["date"], "2024-01-02");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_create_request_accepts_numeric_rate() {
        let json = r#"{"pieces":10,"ratePerPiece":12.5,"session":"Evening"}"#;
        let req: CreateWorkEntryRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_ok());
        let entry = req.into_entry(at(2024, 1, 2, 9));
        assert_eq!(entry.total, Decimal::from(125));
        assert_eq!(entry.session, WorkSession::Evening);
    }

    #[test]
    fn test_new_entry_with_overflowing_total_does_not_panic() {
        let entry = WorkEntry::new(2, Decimal::MAX, WorkSession::Morning, at(2024, 1, 2, 9));
        assert_eq!(entry.total, Decimal::MAX);
        assert_eq!(entry_total(2, Decimal::MAX), None);
    }

    #[test]
    fn test_create_request_rejects_values_above_bounds() {
        let json = r#"{"pieces":2,"ratePerPiece":"79228162514264337593543950335"}"#;
        let req: CreateWorkEntryRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());

        let json = r#"{"pieces":1000001,"ratePerPiece":1}"#;
        let req: CreateWorkEntryRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());

        let json = r#"{"pieces":1000000,"ratePerPiece":1000000}"#;
        let req: CreateWorkEntryRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_non_positive_values() {
        let json = r#"{"pieces":0,"ratePerPiece":5}"#;
        let req: CreateWorkEntryRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());

        let json = r#"{"pieces":3,"ratePerPiece":0}"#;
        let req: CreateWorkEntryRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }
}
