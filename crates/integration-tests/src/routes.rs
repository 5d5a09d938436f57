//! Mock storefront API routes.
//!
//! Behaves like the real API where the client can tell: envelopes, typed
//! error bodies, token rotation on refresh, server-side cart totals and
//! coupon rules.

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use ecom_core::{
    AddItemRequest, ApiResponse, AuthPayload, AuthTokens, AuthUser, Cart, CartItem, CartItemId,
    ConstraintViolation, ErrorBody, ErrorCategory, LoginRequest, PageMeta, ProductQuery,
    ProductSummary, RegisterRequest, UpdateItemRequest, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::{Account, InjectedFailure, MockData, MockState, RecordedRequest};

const CORRELATION_ID_HEADER: &str = "x-correlation-id";
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;
const MIN_PASSWORD_LENGTH: usize = 8;

pub(crate) fn router(state: MockState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{id}", patch(update_item).delete(remove_item))
        .route("/cart/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/products", get(list_products))
        .route("/products/{slug}", get(get_product))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_inject))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

struct ApiError(ErrorBody);

impl ApiError {
    fn new(category: ErrorCategory, message: &str) -> Self {
        Self(ErrorBody::new(category, message))
    }

    fn with_code(self, code: &str) -> Self {
        Self(self.0.with_code(code))
    }

    fn unauthorized() -> Self {
        Self::new(ErrorCategory::Authentication, "Invalid or expired token")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = self.0;
        let status =
            StatusCode::from_u16(body.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        body.timestamp.get_or_insert_with(|| Utc::now().to_rfc3339());
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for InjectedFailure {
    fn into_response(self) -> Response {
        match self {
            Self::Typed(body) => ApiError(body).into_response(),
            Self::Raw { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, body).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[allow(clippy::unnecessary_wraps)]
fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::new(data)))
}

// =============================================================================
// Middleware
// =============================================================================

/// Record the request, echo its correlation id, and serve any injected
/// failure in place of a non-auth response.
async fn record_and_inject(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let correlation_id = header(request.headers(), CORRELATION_ID_HEADER);
    let path = request.uri().path().to_string();
    state.record(RecordedRequest {
        method: request.method().to_string(),
        path: path.clone(),
        bearer: bearer(request.headers()),
        correlation_id: correlation_id.clone(),
    });

    let injected = if path.starts_with("/auth") {
        None
    } else {
        state.take_failure()
    };
    let mut response = match injected {
        Some(failure) => failure.into_response(),
        None => next.run(request).await,
    };

    if let Some(id) = correlation_id
        && let Ok(value) = HeaderValue::from_str(&id)
    {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    header(headers, "authorization")?
        .strip_prefix("Bearer ")
        .map(String::from)
}

fn authenticate(state: &MockState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    let token = bearer(headers).ok_or_else(ApiError::unauthorized)?;
    state
        .data()
        .access_tokens
        .get(&token)
        .cloned()
        .ok_or_else(ApiError::unauthorized)
}

// =============================================================================
// Auth
// =============================================================================

async fn login(State(state): State<MockState>, Json(body): Json<LoginRequest>) -> ApiResult<AuthPayload> {
    let user = {
        let data = state.data();
        data.accounts
            .get(body.email.as_str())
            .filter(|account| account.password == body.password)
            .map(|account| account.user.clone())
    }
    .ok_or_else(|| {
        ApiError::new(ErrorCategory::Authentication, "Invalid email or password")
            .with_code("INVALID_CREDENTIALS")
    })?;

    let tokens = state.issue_tokens(&user.id);
    ok(AuthPayload { user, tokens })
}

async fn register(
    State(state): State<MockState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthPayload>>), ApiError> {
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError(
            ErrorBody::new(ErrorCategory::Validation, "Password is too short").with_details(
                serde_json::json!({ "field": "password", "minLength": MIN_PASSWORD_LENGTH }),
            ),
        ));
    }

    let user = {
        let mut data = state.data();
        if data.accounts.contains_key(body.email.as_str()) {
            return Err(ApiError(ErrorBody::from_constraint(
                ConstraintViolation::Unique,
                "An account with this email already exists",
            )));
        }

        let user = AuthUser {
            id: UserId::new(format!("user_{}", Uuid::new_v4().simple())),
            email: body.email.clone(),
            first_name: body.first_name,
            last_name: body.last_name,
            role: ecom_core::UserRole::Customer,
        };
        data.accounts.insert(
            body.email.as_str().to_string(),
            Account {
                user: user.clone(),
                password: body.password,
            },
        );
        user
    };

    let tokens = state.issue_tokens(&user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(AuthPayload { user, tokens })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

async fn refresh(State(state): State<MockState>, Json(body): Json<RefreshBody>) -> ApiResult<AuthTokens> {
    state.count_refresh_call();

    let delay = state.refresh_delay();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let rejected = || {
        ApiError::new(ErrorCategory::Authentication, "Refresh token is invalid or expired")
            .with_code("INVALID_REFRESH_TOKEN")
    };
    if state.refresh_fails() {
        return Err(rejected());
    }

    // Rotation: a refresh token works once
    let user_id = state
        .data()
        .refresh_tokens
        .remove(&body.refresh_token)
        .ok_or_else(rejected)?;

    ok(state.issue_tokens(&user_id))
}

async fn logout(State(state): State<MockState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let mut data = state.data();
    data.access_tokens.retain(|_, owner| owner != &user_id);
    data.refresh_tokens.retain(|_, owner| owner != &user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<AuthUser> {
    let user_id = authenticate(&state, &headers)?;
    let user = state
        .data()
        .accounts
        .values()
        .find(|account| account.user.id == user_id)
        .map(|account| account.user.clone())
        .ok_or_else(|| ApiError::new(ErrorCategory::NotFound, "User not found"))?;
    ok(user)
}

// =============================================================================
// Cart
// =============================================================================

/// Recompute totals and re-check the applied coupon against the new subtotal.
fn reprice(data: &mut MockData, user_id: &UserId) -> Cart {
    let code = data.cart_for(user_id).coupon_code.clone();
    let coupon = code.as_ref().and_then(|code| data.coupons.get(code).cloned());
    let uses = code.as_ref().map_or(0, |code| {
        data.coupon_uses
            .get(&(user_id.clone(), code.clone()))
            .copied()
            .unwrap_or(0)
    });

    let cart = data.cart_for(user_id);
    cart.discount = Decimal::ZERO;
    cart.recalculate();

    match coupon.map(|coupon| coupon.evaluate(cart.subtotal, Utc::now(), uses)) {
        Some(Ok(discount)) => {
            cart.discount = discount;
            cart.recalculate();
        }
        _ => cart.coupon_code = None,
    }
    cart.clone()
}

fn item_not_found() -> ApiError {
    ApiError::new(ErrorCategory::NotFound, "Cart item not found").with_code("CART_ITEM_NOT_FOUND")
}

fn check_stock(product: &ProductSummary, quantity: u32) -> Result<(), ApiError> {
    match product.stock {
        Some(stock) if quantity > stock => Err(ApiError::new(
            ErrorCategory::BusinessLogic,
            &format!("Only {stock} of {} left in stock", product.name),
        )
        .with_code("INSUFFICIENT_STOCK")),
        _ => Ok(()),
    }
}

async fn get_cart(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;
    let cart = reprice(&mut state.data(), &user_id);
    ok(cart)
}

async fn add_item(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<AddItemRequest>,
) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;
    if body.quantity == 0 {
        return Err(ApiError::new(ErrorCategory::Validation, "Quantity must be at least 1"));
    }

    let mut data = state.data();
    let product = data
        .product(&body.product_id)
        .cloned()
        .ok_or_else(|| ApiError::new(ErrorCategory::NotFound, "Product not found"))?;

    let cart = data.cart_for(&user_id);
    let existing = cart
        .items
        .iter()
        .find(|item| item.matches(&body.product_id, body.variant_id.as_ref()))
        .map_or(0, |item| item.quantity);
    check_stock(&product, existing + body.quantity)?;

    if let Some(item) = cart
        .items
        .iter_mut()
        .find(|item| item.matches(&body.product_id, body.variant_id.as_ref()))
    {
        item.set_quantity(existing + body.quantity);
    } else {
        let id = match &body.variant_id {
            Some(variant) => format!("item_{}_{variant}", body.product_id),
            None => format!("item_{}", body.product_id),
        };
        cart.items.push(CartItem {
            id: CartItemId::new(id),
            product_id: body.product_id.clone(),
            variant_id: body.variant_id.clone(),
            name: product.name.clone(),
            image: product.images.first().cloned(),
            unit_price: product.price,
            quantity: body.quantity,
            line_total: product.price * Decimal::from(body.quantity),
        });
    }

    ok(reprice(&mut data, &user_id))
}

async fn update_item(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(body): Json<UpdateItemRequest>,
) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;
    let item_id = CartItemId::new(item_id);

    let mut data = state.data();
    let product_id = data
        .cart_for(&user_id)
        .item(&item_id)
        .map(|item| item.product_id.clone())
        .ok_or_else(item_not_found)?;
    if let Some(product) = data.product(&product_id) {
        check_stock(product, body.quantity)?;
    }

    let cart = data.cart_for(&user_id);
    if body.quantity == 0 {
        cart.items.retain(|item| item.id != item_id);
    } else if let Some(item) = cart.item_mut(&item_id) {
        item.set_quantity(body.quantity);
    }

    ok(reprice(&mut data, &user_id))
}

async fn remove_item(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;
    let item_id = CartItemId::new(item_id);

    let mut data = state.data();
    let cart = data.cart_for(&user_id);
    if cart.item(&item_id).is_none() {
        return Err(item_not_found());
    }
    cart.items.retain(|item| item.id != item_id);

    ok(reprice(&mut data, &user_id))
}

async fn clear_cart(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;

    let mut data = state.data();
    let cart = data.cart_for(&user_id);
    cart.items.clear();
    cart.coupon_code = None;

    ok(reprice(&mut data, &user_id))
}

#[derive(Deserialize)]
struct CouponBody {
    code: String,
}

async fn apply_coupon(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<CouponBody>,
) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;
    let code = body.code.trim().to_uppercase();

    let mut data = state.data();
    let coupon = data.coupons.get(&code).cloned().ok_or_else(|| {
        ApiError::new(ErrorCategory::NotFound, "Coupon not found").with_code("COUPON_NOT_FOUND")
    })?;
    let uses = data
        .coupon_uses
        .get(&(user_id.clone(), code.clone()))
        .copied()
        .unwrap_or(0);

    let cart = data.cart_for(&user_id);
    if cart.is_empty() {
        return Err(
            ApiError::new(ErrorCategory::BusinessLogic, "Your cart is empty").with_code("CART_EMPTY"),
        );
    }

    let discount = coupon
        .evaluate(cart.subtotal, Utc::now(), uses)
        .map_err(|rejection| {
            ApiError::new(ErrorCategory::BusinessLogic, &rejection.to_string())
                .with_code(rejection.error_code())
        })?;
    cart.coupon_code = Some(code);
    cart.discount = discount;
    cart.recalculate();

    ok(cart.clone())
}

async fn remove_coupon(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<Cart> {
    let user_id = authenticate(&state, &headers)?;

    let mut data = state.data();
    data.cart_for(&user_id).coupon_code = None;

    ok(reprice(&mut data, &user_id))
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(
    State(state): State<MockState>,
    Query(query): Query<ProductQuery>,
) -> Json<ApiResponse<Vec<ProductSummary>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let search = query.search.as_deref().map(str::to_lowercase);

    let matching: Vec<ProductSummary> = state
        .data()
        .products
        .iter()
        .filter(|(category, _)| query.category.as_ref().is_none_or(|wanted| wanted == category))
        .filter(|(_, product)| {
            search
                .as_ref()
                .is_none_or(|needle| product.name.to_lowercase().contains(needle))
        })
        .map(|(_, product)| product.clone())
        .collect();

    let total = matching.len() as u64;
    let skip = ((page - 1) * limit) as usize;
    let items = matching.into_iter().skip(skip).take(limit as usize).collect();

    Json(ApiResponse::paged(items, PageMeta::new(page, limit, total)))
}

async fn get_product(State(state): State<MockState>, Path(slug): Path<String>) -> ApiResult<ProductSummary> {
    let product = state
        .data()
        .products
        .iter()
        .map(|(_, product)| product)
        .find(|product| product.slug == slug)
        .cloned()
        .ok_or_else(|| ApiError::new(ErrorCategory::NotFound, "Product not found"))?;
    ok(product)
}
