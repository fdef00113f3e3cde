//! Contexts stored by requests until their reply arrives.

use std::collections::{BTreeMap, HashMap};

use csta_transport::InvokeId;
use tokio::sync::Mutex;

use crate::UserContext;

/// Bounded invoke-id → context table.
///
/// Entries leave on [`take`](Self::take) (reply seen) or
/// [`remove`](Self::remove) (wait gave up). When full, the oldest entry
/// is evicted.
pub(crate) struct PendingContexts {
    capacity: usize,
    inner: Mutex<Table>,
}

#[derive(Default)]
struct Table {
    seq: u64,
    by_id: HashMap<InvokeId, (u64, UserContext)>,
    order: BTreeMap<u64, InvokeId>,
}

impl Table {
    fn remove(&mut self, id: InvokeId) -> Option<UserContext> {
        let (seq, context) = self.by_id.remove(&id)?;
        self.order.remove(&seq);
        Some(context)
    }
}

impl PendingContexts {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Table::default()),
        }
    }

    pub(crate) async fn insert(&self, id: InvokeId, context: UserContext) {
        let mut table = self.inner.lock().await;
        table.remove(id);

        while table.by_id.len() >= self.capacity {
            let Some((_, oldest)) = table.order.pop_first() else {
                break;
            };
            table.by_id.remove(&oldest);
            tracing::warn!(invoke_id = %oldest, "pending context evicted");
        }

        table.seq += 1;
        let seq = table.seq;
        table.order.insert(seq, id);
        table.by_id.insert(id, (seq, context));
    }

    pub(crate) async fn take(&self, id: InvokeId) -> Option<UserContext> {
        self.inner.lock().await.remove(id)
    }

    pub(crate) async fn remove(&self, id: InvokeId) {
        self.inner.lock().await.remove(id);
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.by_id.len()
    }
}
