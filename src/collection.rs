use crate::results::DownloadResult;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, broadcast};

/// Capacity of the event channel before slow subscribers start lagging
const EVENT_CAPACITY: usize = 256;

/// Change notification published by an [`ImageCollection`]
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    /// All items were removed at the start of a run
    Cleared,

    /// A new item landed at the end of the collection
    Appended {
        index: usize,
        item: Arc<DownloadResult>,
    },
}

/// Append-only, observable sequence of downloaded images
///
/// Items are kept in completion order. Concurrent appends are serialized by an
/// internal lock, so a subscriber sees every item exactly once and in the same
/// order as [`ImageCollection::snapshot`].
#[derive(Debug)]
pub struct ImageCollection {
    items: Mutex<Vec<Arc<DownloadResult>>>,
    events: broadcast::Sender<CollectionEvent>,
}

impl Default for ImageCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCollection {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Subscribe to changes made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    /// Follow appends made after this call without losing any to lag
    ///
    /// The follower only holds a weak reference, so it ends once the last
    /// owner of the collection drops.
    pub async fn follow(self: &Arc<Self>) -> CollectionFollower {
        // Subscribe under the lock so no append slips between len and subscribe
        let items = self.items.lock().await;
        CollectionFollower {
            collection: Arc::downgrade(self),
            events: self.events.subscribe(),
            next_index: items.len(),
            backlog: VecDeque::new(),
        }
    }

    /// Remove every item
    pub async fn clear(&self) {
        let mut items = self.items.lock().await;
        items.clear();
        // No subscribers is not an error
        let _ = self.events.send(CollectionEvent::Cleared);
    }

    /// Append an item and notify subscribers
    pub async fn push(&self, result: DownloadResult) -> Arc<DownloadResult> {
        let item = Arc::new(result);
        let mut items = self.items.lock().await;
        let index = items.len();
        items.push(Arc::clone(&item));

        ::log::trace!("Collection append #{}: {}", index, item.source_url);
        let _ = self.events.send(CollectionEvent::Appended {
            index,
            item: Arc::clone(&item),
        });
        item
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Current items in completion order
    pub async fn snapshot(&self) -> Vec<Arc<DownloadResult>> {
        self.items.lock().await.clone()
    }
}

/// Delivers each appended item exactly once, in index order
///
/// A subscriber that falls behind the event channel is resynced from
/// [`ImageCollection::snapshot`] instead of skipping the missed items.
#[derive(Debug)]
pub struct CollectionFollower {
    collection: Weak<ImageCollection>,
    events: broadcast::Receiver<CollectionEvent>,
    next_index: usize,
    backlog: VecDeque<Arc<DownloadResult>>,
}

impl CollectionFollower {
    /// Next appended item with its index, or `None` once the collection is gone
    pub async fn next(&mut self) -> Option<(usize, Arc<DownloadResult>)> {
        loop {
            if let Some(item) = self.backlog.pop_front() {
                let index = self.next_index;
                self.next_index += 1;
                return Some((index, item));
            }

            match self.events.recv().await {
                Ok(CollectionEvent::Cleared) => {
                    ::log::debug!("Image collection cleared");
                    self.next_index = 0;
                }
                Ok(CollectionEvent::Appended { index, item }) => {
                    // Already delivered from a snapshot
                    if index < self.next_index {
                        continue;
                    }
                    self.next_index = index + 1;
                    return Some((index, item));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    ::log::warn!("Missed {} collection events, resyncing", skipped);
                    let collection = self.collection.upgrade()?;
                    let snapshot = collection.snapshot().await;

                    // Shorter than what was delivered: a clear was among the missed events
                    if snapshot.len() < self.next_index {
                        self.next_index = 0;
                    }
                    self.backlog.extend(snapshot.into_iter().skip(self.next_index));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Everything appended but not yet delivered, read straight from the collection
    ///
    /// Used to finish off once the producer is done, without waiting on events.
    pub async fn catch_up(&mut self) -> Vec<(usize, Arc<DownloadResult>)> {
        let Some(collection) = self.collection.upgrade() else {
            let start = self.next_index;
            self.next_index += self.backlog.len();
            return self
                .backlog
                .drain(..)
                .enumerate()
                .map(|(offset, item)| (start + offset, item))
                .collect();
        };

        let snapshot = collection.snapshot().await;
        if snapshot.len() < self.next_index {
            self.next_index = 0;
        }
        self.backlog.clear();

        let start = self.next_index;
        self.next_index = snapshot.len();
        snapshot.into_iter().enumerate().skip(start).collect()
    }
}
