//! HTTP client wrapper for the storefront API.
//!
//! # Responsibilities
//!
//! - Attach `Authorization: Bearer` from the [`TokenStore`]
//! - Tag every logical request with an `X-Correlation-ID` (kept across replays)
//! - Unwrap `{ data, meta }` envelopes and typed error bodies
//! - On 401, refresh the session through the single-flight coordinator and
//!   replay the request once with the new token
//!
//! Session changes are broadcast as [`SessionEvent`]s so the auth session can
//! react to a refresh failing somewhere deep in a cart call.

mod refresh;

use std::sync::Arc;

use ecom_core::{ApiResponse, AuthTokens, ErrorBody, ErrorCategory};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::tokens::TokenStore;

pub use refresh::RefreshError;
use refresh::{RefreshCoordinator, RefreshOutcome};

/// Header carrying the per-request correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
/// Header some proxies use for the same purpose; echoed back by the API.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Path of the token refresh endpoint.
const REFRESH_PATH: &str = "auth/refresh";
/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 16;

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens were issued by login or registration.
    SignedIn,
    /// Tokens were rotated by a refresh.
    Refreshed,
    /// The user signed out.
    SignedOut,
    /// A refresh failed and the tokens were discarded.
    Expired,
}

/// Per-request behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    authenticated: bool,
    retry_on_unauthorized: bool,
    long_running: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::authenticated()
    }
}

impl RequestOptions {
    /// Send the bearer token and recover from 401 by refreshing.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            authenticated: true,
            retry_on_unauthorized: true,
            long_running: false,
        }
    }

    /// Send no token and treat 401 as a plain error (login, register).
    #[must_use]
    pub const fn public() -> Self {
        Self {
            authenticated: false,
            retry_on_unauthorized: false,
            long_running: false,
        }
    }

    /// Send the token if there is one, but never refresh on 401 (logout).
    #[must_use]
    pub const fn no_retry(mut self) -> Self {
        self.retry_on_unauthorized = false;
        self
    }

    /// Use the long request timeout instead of the default one.
    #[must_use]
    pub const fn long_running(mut self) -> Self {
        self.long_running = true;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Storefront API client.
///
/// Cheaply cloneable; clones share the HTTP connection pool, token store and
/// refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: TokenStore,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a client over an existing token store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, tokens: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                config,
                tokens,
                refresh: RefreshCoordinator::default(),
                events,
            }),
        })
    }

    /// Create a client whose token store follows `config.cookie_file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie file is unreadable or the HTTP client
    /// cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let tokens = match &config.cookie_file {
            Some(path) => TokenStore::persistent(path)?,
            None => TokenStore::in_memory(),
        };
        Self::new(config, tokens)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Subscribe to session lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    // =========================================================================
    // Session bookkeeping
    // =========================================================================

    /// Store tokens issued by login or registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie backend fails to persist.
    pub fn sign_in(&self, tokens: &AuthTokens) -> Result<()> {
        self.tokens().store(tokens)?;
        self.emit(SessionEvent::SignedIn);
        Ok(())
    }

    /// Forget the tokens after a deliberate logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie backend fails to persist.
    pub fn sign_out(&self) -> Result<()> {
        self.tokens().clear()?;
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    fn expire_session(&self) {
        if let Err(e) = self.tokens().clear() {
            warn!(error = %e, "failed to clear tokens after refresh failure");
        }
        self.emit(SessionEvent::Expired);
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// `GET` a path and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send::<T, ()>(Method::GET, path, None, RequestOptions::default())
            .await
            .map(|response| response.data)
    }

    /// `POST` a JSON body and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Some(body), RequestOptions::default())
            .await
            .map(|response| response.data)
    }

    /// `PATCH` a JSON body and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, Some(body), RequestOptions::default())
            .await
            .map(|response| response.data)
    }

    /// `DELETE` a path and unwrap `data`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send::<T, ()>(Method::DELETE, path, None, RequestOptions::default())
            .await
            .map(|response| response.data)
    }

    /// URL of one resource under a collection (`products` + `clay-teapot`).
    ///
    /// `id` is percent-encoded as a single path segment, so `/`, `?` and `#`
    /// inside it never change which endpoint is hit.
    ///
    /// # Errors
    ///
    /// `ClientError::InvalidPathSegment` for an empty, `.` or `..` id.
    pub fn resource_url(&self, collection: &str, id: &str) -> Result<Url> {
        if matches!(id, "" | "." | "..") {
            return Err(ClientError::InvalidPathSegment(id.to_string()));
        }
        let mut url = self.config().endpoint(collection)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Send a request to an API path and decode the full envelope.
    ///
    /// # Errors
    ///
    /// - `ClientError::Network`/`Timeout` if no response arrived
    /// - `ClientError::Api` for non-success statuses
    /// - `ClientError::SessionExpired` if a 401 could not be recovered
    /// - `ClientError::Decode` if the success body has the wrong shape
    pub async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.config().endpoint(path)?;
        self.send_url(method, url, body, options).await
    }

    /// Send a request to a fully built URL (used when a query string is needed).
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    #[instrument(skip(self, body, options), fields(method = %method, path = %url.path()))]
    pub async fn send_url<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(method, url, body, options).await?;
        decode(response).await
    }

    /// Send a request whose success body is irrelevant.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::send`], minus `Decode`.
    pub async fn send_without_content<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config().endpoint(path)?;
        let response = self.execute(method, url, body, options).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(error_from_response(response).await)
    }

    /// Dispatch with auth handling; returns the final raw response.
    async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let correlation_id = Uuid::new_v4().to_string();
        let can_refresh = options.authenticated && options.retry_on_unauthorized;

        let token = if options.authenticated {
            match self.tokens().access_token() {
                Some(token) => Some(token),
                // Access cookie lapsed but the session is alive: refresh first
                None if can_refresh && self.tokens().has_session() => {
                    Some(self.refresh_session_token().await?)
                }
                None => None,
            }
        } else {
            None
        };

        let response = self
            .dispatch(&method, &url, body.as_ref(), token.as_ref(), &correlation_id, options)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || !can_refresh
            || !self.tokens().has_session()
        {
            return Ok(response);
        }

        debug!(%correlation_id, "access token rejected, refreshing session");
        let fresh = self.refresh_after_rejection(token.as_ref()).await?;
        self.dispatch(&method, &url, body.as_ref(), Some(&fresh), &correlation_id, options)
            .await
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: Option<&SecretString>,
        correlation_id: &str,
        options: RequestOptions,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .header(CORRELATION_ID_HEADER, correlation_id);

        if options.long_running {
            request = request.timeout(self.config().long_request_timeout);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Obtain a token to replay a request whose token was just rejected.
    ///
    /// If another task already rotated the token, the new one is reused
    /// without a second refresh.
    async fn refresh_after_rejection(&self, rejected: Option<&SecretString>) -> Result<SecretString> {
        if let Some(current) = self.tokens().access_token() {
            let rotated = rejected.is_none_or(|old| !self.tokens().is_current_access_token(old));
            if rotated {
                debug!("token already rotated by a concurrent refresh");
                return Ok(current);
            }
        }
        self.refresh_session_token().await
    }

    /// Refresh the session, joining any refresh already in flight.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::SessionExpired` if the refresh failed; the tokens
    /// have been cleared and [`SessionEvent::Expired`] emitted by then.
    pub async fn refresh_session_token(&self) -> Result<SecretString> {
        self.inner
            .refresh
            .run(self.perform_refresh())
            .await
            .map_err(ClientError::SessionExpired)
    }

    /// Leader side of a refresh: call the endpoint and store the result.
    #[instrument(skip(self))]
    async fn perform_refresh(&self) -> RefreshOutcome {
        let outcome = self.request_new_tokens().await;
        match &outcome {
            Ok(_) => {
                debug!("session refreshed");
                self.emit(SessionEvent::Refreshed);
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed, signing out");
                self.expire_session();
            }
        }
        outcome
    }

    async fn request_new_tokens(&self) -> RefreshOutcome {
        let refresh_token = self
            .tokens()
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;
        let url = self
            .config()
            .endpoint(REFRESH_PATH)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let response = self
            .inner
            .http
            .post(url)
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match error_from_response(response).await {
                ClientError::Api(body) => body.message,
                other => other.to_string(),
            };
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let tokens = decode::<AuthTokens>(response)
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?
            .data;
        self.tokens()
            .store(&tokens)
            .map_err(|e| RefreshError::Storage(e.to_string()))?;

        Ok(SecretString::from(tokens.access_token))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config().api_url.as_str())
            .field("tokens", self.tokens())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Response decoding
// =============================================================================

/// Decode a response into an envelope, or into `ClientError::Api`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<ApiResponse<T>> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "failed to decode API response"
        );
        ClientError::Decode(e)
    })
}

/// Turn a non-success response into `ClientError::Api`, synthesizing a body
/// when the server did not send a typed one.
async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let echoed_id = response
        .headers()
        .get(CORRELATION_ID_HEADER)
        .or_else(|| response.headers().get(REQUEST_ID_HEADER))
        .and_then(|value| value.to_str().ok())
        .map(String::from);
    let path = response.url().path().to_string();

    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return ClientError::from(e),
    };

    let mut body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| {
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "API returned an untyped error body"
            );
        }
        let message = if text.trim().is_empty() {
            status.canonical_reason().unwrap_or("Request failed").to_string()
        } else {
            text.chars().take(200).collect()
        };
        let mut body = ErrorBody::new(ErrorCategory::from_status(status.as_u16()), message);
        body.status_code = status.as_u16();
        body.path = Some(path);
        body
    });

    if body.correlation_id.is_none() {
        body.correlation_id = echoed_id;
    }

    ClientError::Api(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = ClientConfig::new("https://api.example.com/api/").unwrap();
        ApiClient::new(config, TokenStore::in_memory()).unwrap()
    }

    #[test]
    fn test_resource_url_encodes_identifier() {
        let api = client();

        let url = api.resource_url("products", "clay-teapot").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/products/clay-teapot");

        let url = api.resource_url("products", "tea?x=1#top").unwrap();
        assert_eq!(url.path(), "/api/products/tea%3Fx=1%23top");
        assert_eq!(url.query(), None);

        let url = api.resource_url("cart/items", "../cart").unwrap();
        assert_eq!(url.path(), "/api/cart/items/..%2Fcart");
    }

    #[test]
    fn test_resource_url_rejects_dot_segments() {
        let api = client();
        for id in ["", ".", ".."] {
            assert!(matches!(
                api.resource_url("products", id),
                Err(ClientError::InvalidPathSegment(_))
            ));
        }
    }

    #[test]
    fn test_request_options_presets() {
        let auth = RequestOptions::default();
        assert!(auth.authenticated && auth.retry_on_unauthorized && !auth.long_running);

        let public = RequestOptions::public();
        assert!(!public.authenticated && !public.retry_on_unauthorized);

        let logout = RequestOptions::authenticated().no_retry();
        assert!(logout.authenticated && !logout.retry_on_unauthorized);

        assert!(RequestOptions::authenticated().long_running().long_running);
    }
}
