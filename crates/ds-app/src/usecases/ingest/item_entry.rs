use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use ds_core::{ComponentId, Item, ItemId};

use crate::event::IngestPhase;

/// Aggregator-side state for one item.
///
/// `item` is the committed state. Episodes take turns in the order they were
/// reserved, so two episodes never touch the same components at once.
pub(crate) struct ItemEntry {
    pub item_id: ItemId,
    pub item: RwLock<Item>,
    next_episode: AtomicU64,
    serving: watch::Sender<u64>,
    pub outstanding: AtomicUsize,
    pub all_succeeded: AtomicBool,
    pub deleted: AtomicBool,
    phase: StdMutex<IngestPhase>,
    cancels: StdMutex<HashMap<ComponentId, CancellationToken>>,
}

impl ItemEntry {
    pub fn new(item: Item) -> Self {
        Self {
            item_id: item.id.clone(),
            item: RwLock::new(item),
            next_episode: AtomicU64::new(0),
            serving: watch::channel(0).0,
            outstanding: AtomicUsize::new(0),
            all_succeeded: AtomicBool::new(true),
            deleted: AtomicBool::new(false),
            phase: StdMutex::new(IngestPhase::Pending),
            cancels: StdMutex::new(HashMap::new()),
        }
    }

    /// Reserves the next episode turn. Call it when the work is requested.
    pub fn reserve_episode(&self) -> u64 {
        self.next_episode.fetch_add(1, Ordering::SeqCst)
    }

    /// Waits until `ticket` is served; the turn passes on when the guard drops.
    pub async fn begin_episode(&self, ticket: u64) -> EpisodeTurn<'_> {
        let mut serving = self.serving.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = serving.wait_for(|current| *current == ticket).await;
        EpisodeTurn { serving: &self.serving }
    }

    /// Live phase; `Loading` reports the current outstanding count.
    pub fn phase(&self) -> IngestPhase {
        let phase = *self.phase.lock().unwrap_or_else(|e| e.into_inner());
        match phase {
            IngestPhase::Loading { .. } => IngestPhase::Loading {
                outstanding: self.outstanding.load(Ordering::SeqCst),
            },
            other => other,
        }
    }

    pub fn set_phase(&self, phase: IngestPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    /// Token for the next run of `component_id`.
    ///
    /// A live token is shared with any queued or running episode, so one
    /// cancel reaches all of them; a fired token is replaced.
    pub fn token_for(&self, component_id: &ComponentId) -> CancellationToken {
        let mut cancels = self.cancels.lock().unwrap_or_else(|e| e.into_inner());
        let token = cancels
            .entry(component_id.clone())
            .or_insert_with(CancellationToken::new);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }

    pub fn cancel(&self, component_id: &ComponentId) -> bool {
        let cancels = self.cancels.lock().unwrap_or_else(|e| e.into_inner());
        match cancels.get(component_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let cancels = self.cancels.lock().unwrap_or_else(|e| e.into_inner());
        for token in cancels.values() {
            token.cancel();
        }
    }

    pub fn forget(&self, component_id: &ComponentId) {
        self.cancels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(component_id);
    }

    /// Counts one component run down; true for the caller that reached zero.
    pub fn complete_one(&self, succeeded: bool) -> bool {
        if !succeeded {
            self.all_succeeded.store(false, Ordering::SeqCst);
        }
        self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1
    }
}

pub(crate) struct EpisodeTurn<'a> {
    serving: &'a watch::Sender<u64>,
}

impl Drop for EpisodeTurn<'_> {
    fn drop(&mut self) {
        self.serving.send_modify(|current| *current += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_countdown_reaches_zero_once() {
        let entry = ItemEntry::new(Item::new(ItemId::new(), Utc::now()));
        entry.outstanding.store(3, Ordering::SeqCst);

        let zero_hits = [entry.complete_one(true), entry.complete_one(false), entry.complete_one(true)]
            .iter()
            .filter(|hit| **hit)
            .count();
        assert_eq!(zero_hits, 1);
        assert!(!entry.all_succeeded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_episodes_run_in_reservation_order() {
        let entry = std::sync::Arc::new(ItemEntry::new(Item::new(ItemId::new(), Utc::now())));
        let first = entry.reserve_episode();
        let second = entry.reserve_episode();
        let order = std::sync::Arc::new(StdMutex::new(Vec::new()));

        let later = {
            let (entry, order) = (entry.clone(), order.clone());
            tokio::spawn(async move {
                let _turn = entry.begin_episode(second).await;
                order.lock().unwrap().push(second);
            })
        };
        tokio::task::yield_now().await;
        {
            let _turn = entry.begin_episode(first).await;
            order.lock().unwrap().push(first);
        }
        later.await.unwrap();

        assert_eq!(order.lock().unwrap().as_slice(), &[first, second]);
    }

    #[test]
    fn test_fired_token_is_replaced() {
        let entry = ItemEntry::new(Item::new(ItemId::new(), Utc::now()));
        let id = ComponentId::new();

        let first = entry.token_for(&id);
        assert!(entry.cancel(&id));
        assert!(first.is_cancelled());

        let second = entry.token_for(&id);
        assert!(!second.is_cancelled());
        assert!(!entry.cancel(&ComponentId::new()));
    }
}
