//! Core types for the storefront API.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod email;
pub mod id;
pub mod money;

pub use auth::{AuthPayload, AuthTokens, AuthUser, LoginRequest, RegisterRequest, UserRole};
pub use cart::{AddItemRequest, Cart, CartItem, UpdateItemRequest};
pub use catalog::{ProductQuery, ProductSummary};
pub use coupon::{Coupon, CouponRejection, DiscountType};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money};
