use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    day_bounds, row_to_entry, sort_newest_first, validate_new_entry, EntryStore, StoreResult,
};
use crate::models::work_entry::{WorkEntry, WorkEntryRow};

/// Keeps every user's rows in one JSON array on disk.
///
/// The file is read on open and rewritten (temp file + rename) on each save.
/// A missing file is an empty store.
pub struct JsonFileEntryStore {
    path: PathBuf,
    rows: Mutex<Vec<WorkEntryRow>>,
}

impl JsonFileEntryStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), rows = rows.len(), "Opened entry file");
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_rows(&self, rows: &[WorkEntryRow]) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(rows)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn select<F>(&self, user_id: Uuid, keep: F) -> StoreResult<Vec<WorkEntry>>
    where
        F: Fn(&WorkEntryRow) -> bool,
    {
        let rows = self.rows.lock().await;
        let mut entries = rows
            .iter()
            .filter(|r| r.user_id == user_id && keep(r))
            .cloned()
            .map(row_to_entry)
            .collect::<StoreResult<Vec<_>>>()?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

#[async_trait]
impl EntryStore for JsonFileEntryStore {
    async fn save(&self, user_id: Uuid, entry: WorkEntry) -> StoreResult<WorkEntry> {
        validate_new_entry(&entry)?;

        let row = WorkEntryRow::from_entry(Uuid::new_v4(), user_id, &entry);
        let mut rows = self.rows.lock().await;
        rows.push(row.clone());
        if let Err(e) = self.write_rows(&rows).await {
            // Keep memory in step with the file.
            rows.pop();
            return Err(e);
        }

        tracing::debug!(entry_id = %row.id, user_id = %user_id, "Entry appended to file");
        row_to_entry(row)
    }

    async fn list_all(&self, user_id: Uuid) -> StoreResult<Vec<WorkEntry>> {
        self.select(user_id, |_| true).await
    }

    async fn list_by_date(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkEntry>> {
        let (start, end) = day_bounds(date);
        self.select(user_id, |r| r.timestamp >= start && r.timestamp < end)
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
