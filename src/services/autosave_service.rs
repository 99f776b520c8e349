use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::{db::ClientRecordStore, error::PersistenceError, models::quote::ClientQuote};

const MAX_BACKOFF: Duration = Duration::from_secs(60);

struct PendingWrite {
    generation: u64,
    handle: JoinHandle<()>,
    quote: ClientQuote,
}

/// Debounced full-document writes, one pending write per client.
///
/// Each `schedule` replaces the client's pending write, so a burst of edits
/// produces a single write of the latest version once the quiet period has
/// passed. `flush` cancels whatever is pending and writes straight away.
/// Until a pending write lands, `pending_quote` serves the unsaved version.
/// A failing write is retried every quiet period, then with a doubling
/// backoff after `max_attempts` failures. It is never dropped, only replaced.
pub struct AutosaveService {
    store: Arc<dyn ClientRecordStore>,
    delay: Duration,
    max_attempts: u32,
    pending: Arc<Mutex<HashMap<String, PendingWrite>>>,
    next_generation: AtomicU64,
}

impl AutosaveService {
    pub fn new(store: Arc<dyn ClientRecordStore>, delay: Duration, max_attempts: u32) -> Self {
        Self {
            store,
            delay,
            max_attempts: max_attempts.max(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn schedule(&self, client_id: &str, quote: ClientQuote) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let store = self.store.clone();
        let pending = self.pending.clone();
        let delay = self.delay;
        let max_attempts = self.max_attempts;
        let id = client_id.to_string();
        let latest = quote.clone();

        // Hold the map while spawning so the task cannot clear its entry
        // before it has been inserted.
        let Ok(mut map) = self.pending.lock() else {
            log::error!("Autosave queue lock poisoned, dropping write for {client_id}");
            return;
        };

        let handle = tokio::spawn(async move {
            let mut wait = delay;
            let mut attempt: u32 = 0;
            loop {
                tokio::time::sleep(wait).await;
                attempt = attempt.saturating_add(1);
                match store.put(&id, &quote).await {
                    Ok(()) => {
                        log::debug!("Autosaved quote for {id}");
                        break;
                    }
                    Err(e) if attempt < max_attempts => {
                        log::warn!("Autosave for {id} failed (attempt {attempt}), will retry: {e}");
                    }
                    Err(e) => {
                        if attempt == max_attempts {
                            log::error!(
                                "Autosave for {id} still failing after {attempt} attempts, backing off: {e}"
                            );
                        }
                        wait = (wait * 2).min(MAX_BACKOFF.max(delay));
                    }
                }
            }

            if let Ok(mut map) = pending.lock() {
                if map.get(&id).map(|p| p.generation) == Some(generation) {
                    map.remove(&id);
                }
            }
        });

        if let Some(previous) = map.insert(
            client_id.to_string(),
            PendingWrite {
                generation,
                handle,
                quote: latest,
            },
        ) {
            previous.handle.abort();
        }
    }

    /// Drop the pending write for a client, if any.
    pub fn cancel(&self, client_id: &str) -> bool {
        let previous = match self.pending.lock() {
            Ok(mut map) => map.remove(client_id),
            Err(_) => None,
        };
        match previous {
            Some(write) => {
                write.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, client_id: &str) -> bool {
        self.pending
            .lock()
            .map(|map| map.contains_key(client_id))
            .unwrap_or(false)
    }

    /// The not-yet-written version for a client, if a write is pending.
    pub fn pending_quote(&self, client_id: &str) -> Option<ClientQuote> {
        self.pending
            .lock()
            .ok()
            .and_then(|map| map.get(client_id).map(|p| p.quote.clone()))
    }

    /// Write now, superseding any pending write. Failures are returned.
    pub async fn flush(&self, client_id: &str, quote: &ClientQuote) -> Result<(), PersistenceError> {
        if self.cancel(client_id) {
            log::debug!("Cancelled pending autosave for {client_id}");
        }
        self.store.put(client_id, quote).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryQuoteStore;
    use rust_decimal::Decimal;

    const DELAY: Duration = Duration::from_secs(2);

    fn quote(base: i64) -> ClientQuote {
        ClientQuote {
            base_quote: Decimal::from(base),
            currency: "NZD".to_string(),
            ..Default::default()
        }
    }

    fn service(max_attempts: u32) -> (Arc<MemoryQuoteStore>, AutosaveService) {
        let store = Arc::new(MemoryQuoteStore::new());
        let autosave = AutosaveService::new(store.clone(), DELAY, max_attempts);
        (store, autosave)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_writes_once_with_latest() {
        let (store, autosave) = service(3);

        autosave.schedule("c1", quote(100));
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.schedule("c1", quote(200));
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.schedule("c1", quote(300));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.write_count(), 0);
        assert!(autosave.is_pending("c1"));
        assert_eq!(autosave.pending_quote("c1"), Some(quote(300)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get("c1").await.unwrap(), Some(quote(300)));
        assert!(!autosave.is_pending("c1"));
        assert_eq!(autosave.pending_quote("c1"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_debounced_separately() {
        let (store, autosave) = service(3);

        autosave.schedule("c1", quote(100));
        autosave.schedule("c2", quote(200));
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;

        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_cancels_pending_write() {
        let (store, autosave) = service(3);

        autosave.schedule("c1", quote(100));
        autosave.flush("c1", &quote(500)).await.unwrap();
        assert!(!autosave.is_pending("c1"));

        tokio::time::sleep(DELAY * 3).await;
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get("c1").await.unwrap(), Some(quote(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_autosave_retries_next_window() {
        let (store, autosave) = service(3);
        store.set_failing(true);

        autosave.schedule("c1", quote(100));
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
        assert_eq!(store.write_count(), 0);
        assert!(autosave.is_pending("c1"));

        store.set_failing(false);
        tokio::time::sleep(DELAY).await;
        assert_eq!(store.write_count(), 1);
        assert!(!autosave.is_pending("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draft_survives_long_store_outage() {
        let (store, autosave) = service(3);
        store.set_failing(true);

        autosave.schedule("c1", quote(4242));
        tokio::time::sleep(DELAY * 10).await;
        assert_eq!(store.write_count(), 0);
        assert_eq!(autosave.pending_quote("c1"), Some(quote(4242)));

        store.set_failing(false);
        tokio::time::sleep(MAX_BACKOFF + DELAY).await;
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get("c1").await.unwrap(), Some(quote(4242)));
        assert_eq!(autosave.pending_quote("c1"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_surfaces_store_failure() {
        let (store, autosave) = service(3);
        store.set_failing(true);

        let result = autosave.flush("c1", &quote(100)).await;

        assert_eq!(
            result,
            Err(PersistenceError("store unavailable".to_string()))
        );
    }
}
