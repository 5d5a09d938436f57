//! Ecom Core - Shared wire types for the storefront API.
//!
//! This crate provides the types exchanged between the storefront API and its
//! clients:
//! - `client` - Async client library (token store, auth and cart sessions)
//! - `cli` - Terminal front-end over the client
//! - `integration-tests` - In-process mock of the storefront API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Anything that needs to agree byte-for-byte between the API and
//! the client lives here.
//!
//! # Modules
//!
//! - [`types`] - Ids, money, carts, auth payloads, coupons
//! - [`envelope`] - `{ data, meta }` response envelope
//! - [`error`] - Error taxonomy and the typed error body

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod envelope;
pub mod error;
pub mod types;

pub use envelope::{ApiResponse, PageMeta};
pub use error::{ConstraintViolation, ErrorBody, ErrorCategory};
pub use types::*;
