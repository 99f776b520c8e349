use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use super::ClientRecordStore;
use crate::{error::PersistenceError, models::quote::ClientQuote};

/// Process-local store for development runs and tests.
#[derive(Default)]
pub struct MemoryQuoteStore {
    records: Mutex<HashMap<String, ClientQuote>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, client_id: &str, quote: ClientQuote) -> Self {
        if let Ok(mut records) = self.records.lock() {
            records.insert(client_id.to_string(), quote);
        }
        self
    }

    /// Number of successful `put` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent `put` fail until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock_error() -> PersistenceError {
        PersistenceError("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl ClientRecordStore for MemoryQuoteStore {
    async fn get(&self, client_id: &str) -> Result<Option<ClientQuote>, PersistenceError> {
        let records = self.records.lock().map_err(|_| Self::lock_error())?;
        Ok(records.get(client_id).cloned())
    }

    async fn put(&self, client_id: &str, quote: &ClientQuote) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError("store unavailable".to_string()));
        }
        let mut records = self.records.lock().map_err(|_| Self::lock_error())?;
        records.insert(client_id.to_string(), quote.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
