use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::inventory::item_key;
use crate::domain::tenant::TenantId;

type LockKey = (TenantId, String);

const PRUNE_THRESHOLD: usize = 256;

/// Per-`(tenant, item)` async mutexes.
///
/// The table only holds weak references, so a key's mutex lives exactly as
/// long as some caller holds or waits on it.
#[derive(Default)]
pub struct KeyedLocks {
    table: Mutex<HashMap<LockKey, Weak<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, tenant_id: &TenantId, item_name: &str) -> OwnedMutexGuard<()> {
        let lock = self.lock_for((tenant_id.clone(), item_key(item_name)));
        lock.lock_owned().await
    }

    fn lock_for(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut table = match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = table.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        if table.len() >= PRUNE_THRESHOLD {
            table.retain(|_, weak| weak.strong_count() > 0);
        }

        let lock = Arc::new(AsyncMutex::new(()));
        table.insert(key, Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn live_keys(&self) -> usize {
        match self.table.lock() {
            Ok(table) => table.values().filter(|weak| weak.strong_count() > 0).count(),
            Err(poisoned) => {
                poisoned.into_inner().values().filter(|weak| weak.strong_count() > 0).count()
            }
        }
    }
}
