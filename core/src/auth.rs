//! OAuth grant selection and the token exchange.
//!
//! # Design
//! The grant is an enum rather than a `grant_type` string plus an optional
//! token, so an `AuthRequest` asking for a refresh without a refresh token
//! cannot be built. `Grant::for_record` is the single place that decides.
//!
//! Tokens are only exchanged by an explicit `login`. Other operations read
//! whatever access token is on disk and surface a stale one as
//! `ApiError::Unauthorized`; nothing refreshes behind the caller's back.

use std::fmt;

use tracing::info;

use crate::client::BandcampClient;
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::error::ApiError;
use crate::http::HttpExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    ClientCredentials,
    RefreshToken(String),
}

impl Grant {
    /// Refresh when the stored record has a non-empty refresh token,
    /// otherwise start over with client credentials.
    pub fn for_record(record: Option<&CredentialRecord>) -> Self {
        match record.and_then(|r| r.refresh_token.as_deref()) {
            Some(token) if !token.is_empty() => Grant::RefreshToken(token.to_string()),
            _ => Grant::ClientCredentials,
        }
    }

    /// The OAuth `grant_type` parameter value.
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }
}

/// The application's registered client id and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: u64,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Parameters of one token exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub client_id: u64,
    pub client_secret: String,
    pub grant: Grant,
}

impl AuthRequest {
    pub fn new(credentials: &ClientCredentials, current: Option<&CredentialRecord>) -> Self {
        Self {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret.clone(),
            grant: Grant::for_record(current),
        }
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("client_id", &self.client_id)
            .field("grant_type", &self.grant.grant_type())
            .finish_non_exhaustive()
    }
}

/// Obtains tokens from the provider and persists them.
pub struct TokenManager<S, E> {
    client: BandcampClient,
    store: S,
    executor: E,
}

impl<S: CredentialStore, E: HttpExecutor> TokenManager<S, E> {
    pub fn new(client: BandcampClient, store: S, executor: E) -> Self {
        Self {
            client,
            store,
            executor,
        }
    }

    /// Exchange credentials for a fresh token pair and store the response.
    ///
    /// The stored record is replaced, not merged: a response without a
    /// refresh token drops the previous one, and the next login falls back
    /// to the client-credentials grant.
    pub fn login(&self, credentials: &ClientCredentials) -> Result<CredentialRecord, ApiError> {
        let current = self.store.load();
        let auth = AuthRequest::new(credentials, current.as_ref());
        info!(client_id = auth.client_id, grant_type = auth.grant.grant_type(), "exchanging token");

        let request = self.client.build_token_request(&auth);
        let response = self.executor.execute(&request)?;
        let record = self.client.parse_token_response(response)?;

        self.store.save(&record)?;
        info!(has_refresh_token = record.refresh_token.is_some(), "token stored");
        Ok(record)
    }

    /// The access token currently on disk, without checking freshness.
    pub fn access_token(&self) -> Result<String, ApiError> {
        self.store
            .load()
            .map(|r| r.access_token)
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::http::HttpResponse;
    use crate::testing::ScriptedExecutor;
    use url::form_urlencoded;

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: 42,
            client_secret: "secret".into(),
        }
    }

    fn grant_type_sent(body: &str) -> String {
        form_urlencoded::parse(body.as_bytes())
            .find(|(k, _)| k == "grant_type")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn refresh_token_selects_refresh_grant() {
        let record = CredentialRecord::new("a", Some("r".into()));
        assert_eq!(Grant::for_record(Some(&record)), Grant::RefreshToken("r".into()));
    }

    #[test]
    fn absent_or_tokenless_record_selects_client_credentials() {
        assert_eq!(Grant::for_record(None), Grant::ClientCredentials);
        let record = CredentialRecord::new("a", None);
        assert_eq!(Grant::for_record(Some(&record)), Grant::ClientCredentials);
        let record = CredentialRecord::new("a", Some(String::new()));
        assert_eq!(Grant::for_record(Some(&record)), Grant::ClientCredentials);
    }

    #[test]
    fn debug_output_hides_secret() {
        let auth = AuthRequest::new(&credentials(), None);
        let printed = format!("{auth:?} {:?}", credentials());
        assert!(!printed.contains("\"secret\""));
        assert!(printed.contains("client_credentials"));
    }

    #[test]
    fn first_login_uses_client_credentials_and_persists_response() {
        let store = MemoryCredentialStore::default();
        let executor = ScriptedExecutor::new(vec![Ok(HttpResponse::new(
            200,
            r#"{"ok":true,"access_token":"a1","refresh_token":"r1","expires_in":3600}"#,
        ))]);
        let manager = TokenManager::new(BandcampClient::default(), &store, &executor);

        let record = manager.login(&credentials()).unwrap();
        assert_eq!(record.access_token, "a1");
        assert_eq!(store.load().unwrap().refresh_token.as_deref(), Some("r1"));
        assert_eq!(grant_type_sent(&executor.requests()[0].body), "client_credentials");
        assert_eq!(manager.access_token().unwrap(), "a1");
    }

    #[test]
    fn second_login_refreshes_and_drops_missing_refresh_token() {
        let store = MemoryCredentialStore::new(Some(CredentialRecord::new("a1", Some("r1".into()))));
        let executor = ScriptedExecutor::new(vec![
            Ok(HttpResponse::new(200, r#"{"access_token":"a2"}"#)),
            Ok(HttpResponse::new(200, r#"{"access_token":"a3","refresh_token":"r3"}"#)),
        ]);
        let manager = TokenManager::new(BandcampClient::default(), &store, &executor);

        manager.login(&credentials()).unwrap();
        let stored = store.load().unwrap();
        assert_eq!(stored.access_token, "a2");
        assert!(stored.refresh_token.is_none());

        manager.login(&credentials()).unwrap();
        let requests = executor.requests();
        assert_eq!(grant_type_sent(&requests[0].body), "refresh_token");
        assert_eq!(grant_type_sent(&requests[1].body), "client_credentials");
    }

    #[test]
    fn failed_exchange_leaves_store_untouched() {
        let original = CredentialRecord::new("a1", Some("r1".into()));
        let store = MemoryCredentialStore::new(Some(original.clone()));
        let executor = ScriptedExecutor::new(vec![Ok(HttpResponse::new(
            400,
            r#"{"error":"invalid_grant","error_description":"refresh token revoked"}"#,
        ))]);
        let manager = TokenManager::new(BandcampClient::default(), &store, &executor);

        let err = manager.login(&credentials()).unwrap_err();
        assert!(matches!(err, ApiError::Remote(ref m) if m == "refresh token revoked"));
        assert_eq!(store.load().unwrap(), original);
    }

    #[test]
    fn access_token_without_login_is_unauthorized() {
        let store = MemoryCredentialStore::default();
        let executor = ScriptedExecutor::new(vec![]);
        let manager = TokenManager::new(BandcampClient::default(), &store, &executor);
        assert!(matches!(manager.access_token(), Err(ApiError::Unauthorized)));
    }
}
