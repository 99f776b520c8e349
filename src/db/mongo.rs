use async_trait::async_trait;
use mongodb::{
    bson::{doc, DateTime},
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::ClientRecordStore;
use crate::{error::PersistenceError, models::quote::ClientQuote};

const QUOTES_COLLECTION: &str = "Clients";

pub async fn create_mongo_client(uri: &str) -> mongodb::error::Result<Arc<Client>> {
    log::info!("Connecting to MongoDB");

    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    // Server API v1 for MongoDB 5.0+
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;

    match client.database("admin").run_command(doc! {"ping": 1}).await {
        Ok(_) => log::info!("Connected to MongoDB and verified with ping"),
        Err(e) => {
            log::warn!("Connected to MongoDB but ping failed: {}", e);
            log::warn!("The API may still start, but saves will fail until the database is reachable");
        }
    }

    Ok(Arc::new(client))
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredQuote {
    #[serde(rename = "_id")]
    client_id: String,
    document: ClientQuote,
    updated_at: DateTime,
}

pub struct MongoQuoteStore {
    client: Arc<Client>,
    database: String,
}

impl MongoQuoteStore {
    pub fn new(client: Arc<Client>, database: &str) -> Self {
        Self {
            client,
            database: database.to_string(),
        }
    }

    fn collection(&self) -> Collection<StoredQuote> {
        self.client
            .database(&self.database)
            .collection(QUOTES_COLLECTION)
    }
}

#[async_trait]
impl ClientRecordStore for MongoQuoteStore {
    async fn get(&self, client_id: &str) -> Result<Option<ClientQuote>, PersistenceError> {
        let record = self
            .collection()
            .find_one(doc! { "_id": client_id })
            .await?;
        Ok(record.map(|r| r.document))
    }

    async fn put(&self, client_id: &str, quote: &ClientQuote) -> Result<(), PersistenceError> {
        let record = StoredQuote {
            client_id: client_id.to_string(),
            document: quote.clone(),
            updated_at: DateTime::now(),
        };

        self.collection()
            .replace_one(doc! { "_id": client_id }, record)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        self.client
            .database(&self.database)
            .run_command(doc! {"ping": 1})
            .await?;
        Ok(())
    }
}
