use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::model::{ItemId, WorkItem};

/// Supplier of read-only work item snapshots.
pub trait WorkItemSource: Send + Sync {
    /// Every known item, ordered by id.
    fn snapshot(&self) -> Vec<WorkItem>;

    fn find(&self, id: ItemId) -> Option<WorkItem> {
        self.snapshot().into_iter().find(|item| item.id == id)
    }
}

/// In-process [`WorkItemSource`] fed by the embedding application.
#[derive(Debug, Default)]
pub struct InMemoryWorkItems {
    items: Mutex<BTreeMap<ItemId, WorkItem>>,
}

impl InMemoryWorkItems {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ItemId, WorkItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace by id. Returns the replaced snapshot, if any.
    pub fn upsert(&self, item: WorkItem) -> Option<WorkItem> {
        debug!(item = %item.id, completed = item.completed, blocked = item.blocked, "work item upserted");
        self.lock().insert(item.id, item)
    }

    pub fn remove(&self, id: ItemId) -> Option<WorkItem> {
        self.lock().remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl FromIterator<WorkItem> for InMemoryWorkItems {
    fn from_iter<T: IntoIterator<Item = WorkItem>>(iter: T) -> Self {
        let items = iter.into_iter().map(|item| (item.id, item)).collect();
        Self {
            items: Mutex::new(items),
        }
    }
}

impl WorkItemSource for InMemoryWorkItems {
    fn snapshot(&self) -> Vec<WorkItem> {
        self.lock().values().cloned().collect()
    }

    fn find(&self, id: ItemId) -> Option<WorkItem> {
        self.lock().get(&id).cloned()
    }
}
