use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    db::ClientRecordStore,
    error::{AccessError, ApiError, PersistenceError},
    models::share_link::{ShareLink, SharedDocument},
};

const SHARE_LINKS_COLLECTION: &str = "ShareLinks";
const TOKEN_LENGTH: usize = 32;

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn new_link(client_id: &str, ttl_days: Option<i64>) -> ShareLink {
    let now = Utc::now();
    ShareLink {
        client_id: client_id.to_string(),
        token: generate_token(),
        active: true,
        created_at: now,
        expires_at: ttl_days.map(|days| now + Duration::days(days)),
    }
}

/// Resolves share tokens to the client's document.
#[async_trait]
pub trait ShareLinkGateway: Send + Sync {
    /// The document behind a token plus whether the link is live.
    ///
    /// Unknown and expired tokens fail; a disabled link still resolves with
    /// `active == false` so callers decide how to deny.
    async fn open(&self, client_id: &str, token: &str) -> Result<SharedDocument, ApiError>;

    async fn issue(&self, client_id: &str, ttl_days: Option<i64>) -> Result<ShareLink, PersistenceError>;

    async fn set_active(&self, client_id: &str, token: &str, active: bool) -> Result<bool, PersistenceError>;

    async fn list(&self, client_id: &str) -> Result<Vec<ShareLink>, PersistenceError>;
}

/// Open a link and refuse anything that is not live.
pub async fn open_active(
    gateway: &dyn ShareLinkGateway,
    client_id: &str,
    token: &str,
) -> Result<SharedDocument, ApiError> {
    let shared = gateway.open(client_id, token).await?;
    if !shared.active {
        log::info!("Denied disabled share link for {client_id}");
        return Err(AccessError::Disabled.into());
    }
    Ok(shared)
}

async fn resolve(
    link: Option<ShareLink>,
    store: &dyn ClientRecordStore,
    client_id: &str,
) -> Result<SharedDocument, ApiError> {
    let link = link.ok_or(AccessError::InvalidToken)?;
    if link.is_expired(Utc::now()) {
        return Err(AccessError::Expired.into());
    }

    let document = store
        .get(client_id)
        .await?
        .ok_or(AccessError::InvalidToken)?;

    Ok(SharedDocument {
        document,
        active: link.active,
    })
}

pub struct MongoShareLinkGateway {
    client: Arc<Client>,
    database: String,
    store: Arc<dyn ClientRecordStore>,
}

impl MongoShareLinkGateway {
    pub fn new(client: Arc<Client>, database: &str, store: Arc<dyn ClientRecordStore>) -> Self {
        Self {
            client,
            database: database.to_string(),
            store,
        }
    }

    fn collection(&self) -> Collection<ShareLink> {
        self.client
            .database(&self.database)
            .collection(SHARE_LINKS_COLLECTION)
    }
}

#[async_trait]
impl ShareLinkGateway for MongoShareLinkGateway {
    async fn open(&self, client_id: &str, token: &str) -> Result<SharedDocument, ApiError> {
        let link = self
            .collection()
            .find_one(doc! { "client_id": client_id, "token": token })
            .await
            .map_err(PersistenceError::from)?;
        resolve(link, self.store.as_ref(), client_id).await
    }

    async fn issue(&self, client_id: &str, ttl_days: Option<i64>) -> Result<ShareLink, PersistenceError> {
        let link = new_link(client_id, ttl_days);
        self.collection().insert_one(&link).await?;
        log::info!("Issued share link for {client_id}");
        Ok(link)
    }

    async fn set_active(&self, client_id: &str, token: &str, active: bool) -> Result<bool, PersistenceError> {
        let result = self
            .collection()
            .update_one(
                doc! { "client_id": client_id, "token": token },
                doc! { "$set": { "active": active } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn list(&self, client_id: &str) -> Result<Vec<ShareLink>, PersistenceError> {
        let cursor = self
            .collection()
            .find(doc! { "client_id": client_id })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

/// Process-local links for development runs and tests.
pub struct MemoryShareLinkGateway {
    links: Mutex<HashMap<String, ShareLink>>,
    store: Arc<dyn ClientRecordStore>,
}

impl MemoryShareLinkGateway {
    pub fn new(store: Arc<dyn ClientRecordStore>) -> Self {
        Self {
            links: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Register a link as-is, e.g. one that is already expired.
    pub fn insert(&self, link: ShareLink) {
        if let Ok(mut links) = self.links.lock() {
            links.insert(link.token.clone(), link);
        }
    }

    fn lock_error() -> PersistenceError {
        PersistenceError("share link lock poisoned".to_string())
    }
}

#[async_trait]
impl ShareLinkGateway for MemoryShareLinkGateway {
    async fn open(&self, client_id: &str, token: &str) -> Result<SharedDocument, ApiError> {
        let link = {
            let links = self.links.lock().map_err(|_| Self::lock_error())?;
            links
                .get(token)
                .filter(|link| link.client_id == client_id)
                .cloned()
        };
        resolve(link, self.store.as_ref(), client_id).await
    }

    async fn issue(&self, client_id: &str, ttl_days: Option<i64>) -> Result<ShareLink, PersistenceError> {
        let link = new_link(client_id, ttl_days);
        self.insert(link.clone());
        Ok(link)
    }

    async fn set_active(&self, client_id: &str, token: &str, active: bool) -> Result<bool, PersistenceError> {
        let mut links = self.links.lock().map_err(|_| Self::lock_error())?;
        match links.get_mut(token).filter(|link| link.client_id == client_id) {
            Some(link) => {
                link.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, client_id: &str) -> Result<Vec<ShareLink>, PersistenceError> {
        let links = self.links.lock().map_err(|_| Self::lock_error())?;
        Ok(links
            .values()
            .filter(|link| link.client_id == client_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memory::MemoryQuoteStore, models::quote::ClientQuote};

    fn gateway() -> MemoryShareLinkGateway {
        let store = MemoryQuoteStore::new().with_record(
            "c1",
            ClientQuote {
                currency: "NZD".to_string(),
                ..Default::default()
            },
        );
        MemoryShareLinkGateway::new(Arc::new(store))
    }

    fn access_error(result: Result<SharedDocument, ApiError>) -> AccessError {
        match result {
            Err(ApiError::Access(e)) => e,
            other => panic!("expected access error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_issued_link_opens_document() {
        let gateway = gateway();
        let link = gateway.issue("c1", Some(30)).await.unwrap();

        assert_eq!(link.token.len(), TOKEN_LENGTH);
        let shared = open_active(&gateway, "c1", &link.token).await.unwrap();
        assert!(shared.active);
        assert_eq!(shared.document.currency, "NZD");
    }

    #[tokio::test]
    async fn test_token_is_bound_to_its_client() {
        let gateway = gateway();
        let link = gateway.issue("c1", None).await.unwrap();

        let err = access_error(gateway.open("c2", &link.token).await);
        assert_eq!(err, AccessError::InvalidToken);
    }

    #[tokio::test]
    async fn test_disabled_link_is_denied() {
        let gateway = gateway();
        let link = gateway.issue("c1", None).await.unwrap();
        assert!(gateway.set_active("c1", &link.token, false).await.unwrap());

        let shared = gateway.open("c1", &link.token).await.unwrap();
        assert!(!shared.active);

        let err = access_error(open_active(&gateway, "c1", &link.token).await);
        assert_eq!(err, AccessError::Disabled);
    }

    #[tokio::test]
    async fn test_expired_link_is_denied() {
        let gateway = gateway();
        gateway.insert(ShareLink {
            client_id: "c1".to_string(),
            token: "old-token".to_string(),
            active: true,
            created_at: Utc::now() - Duration::days(40),
            expires_at: Some(Utc::now() - Duration::days(10)),
        });

        let err = access_error(gateway.open("c1", "old-token").await);
        assert_eq!(err, AccessError::Expired);
    }
}
