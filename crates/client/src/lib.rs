//! Ecom Client - async client for the storefront API.
//!
//! # Layers
//!
//! - [`tokens`] - Access/refresh cookies with expiry, optionally persisted
//! - [`http`] - Request wrapper: bearer auth, correlation ids, envelope
//!   decoding, single-flight token refresh on 401
//! - [`auth`] - Signed-in user state and the proactive refresh timer
//! - [`cart`] - Optimistic cart session with rollback
//! - [`catalog`] - Cached product reads
//!
//! # Example
//!
//! ```rust,ignore
//! let api = ApiClient::from_config(ClientConfig::from_env()?)?;
//! let auth = AuthSession::new(api.clone());
//! auth.login("customer@example.com", "hunter22").await?;
//! let _timer = auth.start_refresh_timer();
//!
//! let cart = CartSession::new(CartClient::new(api));
//! cart.load().await?;
//! cart.add_item(&AddItemRequest::new("prod_123", 2)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod tokens;

pub use auth::{AuthSession, AuthState, RefreshTimer};
pub use cart::{CartApi, CartClient, CartSession, CartState};
pub use catalog::{CatalogClient, Page};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use http::{ApiClient, RefreshError, RequestOptions, SessionEvent};
pub use tokens::{TokenStore, TokenStoreError};
