use async_trait::async_trait;

use crate::{error::PersistenceError, models::quote::ClientQuote};

pub mod memory;
pub mod mongo;

/// Whole-document storage for client quotes, keyed by client id.
///
/// There is no versioning: the last `put` for a client wins.
#[async_trait]
pub trait ClientRecordStore: Send + Sync {
    async fn get(&self, client_id: &str) -> Result<Option<ClientQuote>, PersistenceError>;
    async fn put(&self, client_id: &str, quote: &ClientQuote) -> Result<(), PersistenceError>;
    async fn ping(&self) -> Result<(), PersistenceError>;
}
