use async_trait::async_trait;
use chrono::NaiveDate;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    day_bounds, row_to_entry, sort_newest_first, validate_new_entry, EntryStore, StoreResult,
};
use crate::models::work_entry::{WorkEntry, WorkEntryRow};

/// In-process store. Rows live only as long as the process.
#[derive(Clone, Default)]
pub struct MemoryEntryStore {
    rows: Arc<RwLock<HashMap<Uuid, Vec<WorkEntryRow>>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn save(&self, user_id: Uuid, entry: WorkEntry) -> StoreResult<WorkEntry> {
        validate_new_entry(&entry)?;

        let row = WorkEntryRow::from_entry(Uuid::new_v4(), user_id, &entry);
        self.rows
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(row.clone());

        row_to_entry(row)
    }

    async fn list_all(&self, user_id: Uuid) -> StoreResult<Vec<WorkEntry>> {
        let rows = self.rows.read().await;
        let mut entries = rows
            .get(&user_id)
            .into_iter()
            .flatten()
            .cloned()
            .map(row_to_entry)
            .collect::<StoreResult<Vec<_>>>()?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    async fn list_by_date(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Vec<WorkEntry>> {
        let (start, end) = day_bounds(date);
        let rows = self.rows.read().await;
        let mut entries = rows
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter(|r| r.timestamp >= start && r.timestamp < end)
            .cloned()
            .map(row_to_entry)
            .collect::<StoreResult<Vec<_>>>()?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_save_assigns_id_and_owner() {
        contract::save_assigns_id_and_owner(&MemoryEntryStore::new()).await;
    }

    #[tokio::test]
    async fn test_save_rejects_zero_pieces() {
        contract::save_rejects_zero_pieces(&MemoryEntryStore::new()).await;
    }

    #[tokio::test]
    async fn test_list_all_newest_first_and_scoped() {
        contract::list_all_is_newest_first_and_scoped(&MemoryEntryStore::new()).await;
    }

    #[tokio::test]
    async fn test_list_by_date_uses_timestamp_range() {
        contract::list_by_date_uses_timestamp_range(&MemoryEntryStore::new()).await;
    }

    #[tokio::test]
    async fn test_clones_share_rows() {
        let store = MemoryEntryStore::new();
        let handle = store.clone();
        let user = Uuid::new_v4();
        store
            .save(user, contract::entry(2, 3, contract::ts(4, 8)))
            .await
            .unwrap();
        assert_eq!(handle.list_all(user).await.unwrap().len(), 1);
    }
}
