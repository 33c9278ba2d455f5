//! Access-token storage and refresh.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::service::ServiceError;
use crate::storage::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_SQID_KEY: &str = "user_sqid";

/// Token holder consumed by the bridge. Only the access token ever crosses
/// into the editor frame.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn user_sqid(&self) -> Option<String>;

    /// Exchange the refresh token for a new access token. `true` on success.
    async fn refresh_access_token(&self) -> bool;

    fn clear_tokens(&self);
}

/// Token pair returned by the refresh endpoint. The backend may rotate the
/// refresh token or keep the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// The refresh endpoint.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> std::result::Result<TokenPair, ServiceError>;
}

/// [`TokenStore`] backed by a [`KeyValueStore`] and a [`RefreshClient`].
///
/// Concurrent refreshes are serialized: a caller that waited behind another
/// refresh reuses its result instead of spending the refresh token twice.
pub struct StoredTokens<S: KeyValueStore, R: RefreshClient> {
    store: S,
    client: R,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl<S: KeyValueStore, R: RefreshClient> StoredTokens<S, R> {
    pub fn new(store: S, client: R) -> Self {
        Self {
            store,
            client,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Persist a freshly issued session (login or registration).
    pub fn store_session(&self, pair: &TokenPair, user_sqid: Option<&str>) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        if let Some(refresh) = &pair.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        if let Some(sqid) = user_sqid {
            self.store.set(USER_SQID_KEY, sqid)?;
        }
        Ok(())
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.store.get(key).filter(|v| !v.is_empty())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<S: KeyValueStore, R: RefreshClient> TokenStore for StoredTokens<S, R> {
    fn access_token(&self) -> Option<String> {
        self.non_empty(ACCESS_TOKEN_KEY)
    }

    fn user_sqid(&self) -> Option<String> {
        self.non_empty(USER_SQID_KEY)
    }

    async fn refresh_access_token(&self) -> bool {
        let before = self.access_token();
        let _guard = self.refresh_lock.lock().await;

        let current = self.access_token();
        if current.is_some() && current != before {
            debug!("access token already refreshed by a concurrent caller");
            return true;
        }

        let Some(refresh_token) = self.non_empty(REFRESH_TOKEN_KEY) else {
            debug!("no refresh token stored; refresh skipped");
            return false;
        };

        match self.client.refresh(&refresh_token).await {
            Ok(pair) => {
                if let Err(e) = self.store_session(&pair, None) {
                    warn!(error = %e, "failed to persist refreshed tokens");
                    return false;
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                false
            }
        }
    }

    fn clear_tokens(&self) {
        self.store.remove(ACCESS_TOKEN_KEY);
        self.store.remove(REFRESH_TOKEN_KEY);
        self.store.remove(USER_SQID_KEY);
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn access_token(&self) -> Option<String> {
        (**self).access_token()
    }

    fn user_sqid(&self) -> Option<String> {
        (**self).user_sqid()
    }

    async fn refresh_access_token(&self) -> bool {
        (**self).refresh_access_token().await
    }

    fn clear_tokens(&self) {
        (**self).clear_tokens()
    }
}
