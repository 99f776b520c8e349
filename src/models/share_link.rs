use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quote::ClientQuote;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShareLink {
    pub client_id: String,
    pub token: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// What a share token opens: the client's document and whether the link is live.
#[derive(Debug, Clone)]
pub struct SharedDocument {
    pub document: ClientQuote,
    pub active: bool,
}
