use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{day_bounds, row_to_entry, validate_new_entry, EntryStore, StoreResult};
use crate::models::work_entry::{WorkEntry, WorkEntryRow};

// Equal timestamps fall back to insertion order via `seq`.
const SELECT_ALL: &str = r#"
    SELECT id, user_id, pieces, rate, total, session, timestamp
    FROM work_entries
    WHERE user_id = $1
    ORDER BY timestamp DESC, seq ASC
"#;

const SELECT_BY_DAY: &str = r#"
    SELECT id, user_id, pieces, rate, total, session, timestamp
    FROM work_entries
    WHERE user_id = $1 AND timestamp >= $2 AND timestamp < $3
    ORDER BY timestamp DESC, seq ASC
"#;

/// Remote store over the `work_entries` table.
#[derive(Clone)]
pub struct PgEntryStore {
    db: PgPool,
}

impl PgEntryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.db).await
    }
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn save(&self, user_id: Uuid, entry: WorkEntry) -> StoreResult<WorkEntry> {
        validate_new_entry(&entry)?;

        let row = WorkEntryRow::from_entry(Uuid::new_v4(), user_id, &entry);
        let saved = sqlx::query_as::<_, WorkEntryRow>(
            r#"
            INSERT INTO work_entries (id, user_id, pieces, rate, total, session, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, pieces, rate, total, session, timestamp
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.pieces)
        .bind(row.rate)
        .bind(row.total)
        .bind(&row.session)
        .bind(row.timestamp)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(entry_id = %saved.id, user_id = %user_id, "Entry inserted");
        row_to_entry(saved)
    }

    async fn list_all(&self, user_id: Uuid) -> StoreResult<Vec<WorkEntry>> {
        let rows = sqlx::query_as::<_, WorkEntryRow>(SELECT_ALL)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn list_by_date(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkEntry>> {
        let (start, end) = day_bounds(date);

        let rows = sqlx::query_as::<_, WorkEntryRow>(SELECT_BY_DAY)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(row_to_entry).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
