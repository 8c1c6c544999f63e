//! OAuth token records.
//!
//! Plain records with the columns the token endpoints need; nothing here
//! depends on how a particular OAuth server represents tokens in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seniorcare_core::{EntityId, UserId};

/// Fields shared by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFields {
    pub token: String,
    pub client_id: String,
    pub user_id: UserId,
    /// Unix timestamp (seconds); `None` never expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenFields {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now.timestamp())
    }

    /// Seconds left before expiry (negative once expired).
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|at| at - now.timestamp())
    }

    pub fn has_scope(&self, wanted: &str) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|s| s.split_whitespace().any(|s| s == wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: TokenFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: TokenFields,
}

impl_record!(AccessToken, "tbl_oauth2_access_token");
impl_record!(RefreshToken, "tbl_oauth2_refresh_token");

impl AccessToken {
    pub fn new(fields: TokenFields) -> Self {
        Self {
            id: EntityId::new(),
            fields,
        }
    }
}

impl RefreshToken {
    pub fn new(fields: TokenFields) -> Self {
        Self {
            id: EntityId::new(),
            fields,
        }
    }
}
