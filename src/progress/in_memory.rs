use super::*;
use crate::service::ServiceId;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub struct InMemoryProgressTracker {
    store: Mutex<BTreeMap<ServiceId, Offset>>,
}

impl InMemoryProgressTracker {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(BTreeMap::default()),
        }
    }

    pub fn new_shared() -> SharedProgressTracker {
        Arc::new(Self::new())
    }
}

impl ProgressTracker for InMemoryProgressTracker {
    fn load(&self, id: ServiceIdRef) -> Result<Option<Offset>> {
        Ok(self.store.lock().get(id).cloned())
    }

    fn store(&self, id: ServiceIdRef, offset: Offset) -> Result<()> {
        self.store.lock().insert(id.to_owned(), offset);
        Ok(())
    }
}
