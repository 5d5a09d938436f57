//! Integration tests for the ecom storefront client.
//!
//! Runs an in-process mock of the storefront API on `127.0.0.1:0` and drives
//! the real client against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ecom-integration-tests
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let server = TestServer::start().await;
//! let api = server.client();
//!
//! AuthSession::new(api.clone())
//!     .login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD)
//!     .await?;
//! assert_eq!(server.state().refresh_calls(), 0);
//! ```
//!
//! # Test Categories
//!
//! - `token_refresh` - Single-flight refresh, stale tokens, failed refresh
//! - `auth_session` - Login, registration, restore, logout, refresh timer
//! - `cart_session` - Optimistic cart against server-side totals and coupons
//! - `api_errors` - Error bodies, correlation ids, catalog caching

mod routes;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use ecom_client::{ApiClient, ClientConfig, TokenStore};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use state::{
    CUSTOMER_EMAIL, CUSTOMER_PASSWORD, InjectedFailure, MockState, RecordedRequest,
};

/// A running mock API. The server stops when this is dropped.
pub struct TestServer {
    addr: SocketAddr,
    state: MockState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with seeded data on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = MockState::seeded();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let addr = listener.local_addr().expect("mock server has no address");

        let app = routes::router(state.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the API.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    #[must_use]
    pub const fn state(&self) -> &MockState {
        &self.state
    }

    /// Client configuration pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics if the server URL does not parse, which cannot happen.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.url()).expect("mock server URL is valid");
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// A fresh client with an in-memory token store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        self.client_with(self.config(), TokenStore::in_memory())
    }

    /// A client over a specific config and token store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client_with(&self, config: ClientConfig, tokens: TokenStore) -> ApiClient {
        ApiClient::new(config, tokens).expect("failed to build API client")
    }
}

/// A base URL on a local port nothing listens on.
///
/// # Panics
///
/// Panics if no local port can be bound.
#[must_use]
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind a spare port");
    let addr = listener.local_addr().expect("spare port has no address");
    drop(listener);
    format!("http://{addr}/")
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
