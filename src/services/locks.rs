// src/services/locks.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per module id, so master content for a module is
/// generated by at most one request at a time in this process.
///
/// Entries only live while someone holds or waits for them.
#[derive(Debug, Default)]
pub struct GenerationLocks {
    modules: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Held generation token for one module. Released on drop.
#[derive(Debug)]
pub struct ModuleGuard<'a> {
    locks: &'a GenerationLocks,
    module_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the module's generation token.
    pub async fn acquire(&self, module_id: i64) -> ModuleGuard<'_> {
        let lock = {
            let mut modules = self.modules.lock().unwrap_or_else(|e| e.into_inner());
            modules.entry(module_id).or_default().clone()
        };
        ModuleGuard {
            locks: self,
            module_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of modules with a holder or waiter.
    pub fn len(&self) -> usize {
        self.modules.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ModuleGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut modules = self.locks.modules.lock().unwrap_or_else(|e| e.into_inner());
        // Waiters clone the Arc under this same mutex, so a count of one means
        // only the map still refers to it.
        if modules
            .get(&self.module_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            modules.remove(&self.module_id);
        }
    }
}
