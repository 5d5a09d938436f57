//! In-memory data behind the mock API, plus knobs tests use to script it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use ecom_core::{
    AuthTokens, AuthUser, Cart, CartId, Coupon, CouponId, DiscountType, Email, ErrorBody,
    ProductId, ProductSummary, UserId, UserRole,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Seeded customer account.
pub const CUSTOMER_EMAIL: &str = "customer@example.com";
/// Password of [`CUSTOMER_EMAIL`].
pub const CUSTOMER_PASSWORD: &str = "correct-horse-battery";

/// Access token lifetime the mock grants unless told otherwise.
const DEFAULT_ACCESS_TTL_SECS: i64 = 900;
const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// A failure the next non-auth request will receive instead of its response.
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// A typed error body with its own status.
    Typed(ErrorBody),
    /// A bare status with a non-JSON body, as a misbehaving proxy would send.
    Raw { status: u16, body: String },
}

/// One request as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub correlation_id: Option<String>,
}

pub(crate) struct Account {
    pub(crate) user: AuthUser,
    pub(crate) password: String,
}

pub(crate) struct MockData {
    pub(crate) accounts: HashMap<String, Account>,
    pub(crate) access_tokens: HashMap<String, UserId>,
    pub(crate) refresh_tokens: HashMap<String, UserId>,
    pub(crate) carts: HashMap<UserId, Cart>,
    /// `(category, product)`
    pub(crate) products: Vec<(String, ProductSummary)>,
    pub(crate) coupons: HashMap<String, Coupon>,
    pub(crate) coupon_uses: HashMap<(UserId, String), u32>,
}

struct Knobs {
    refresh_delay: Duration,
    fail_refresh: bool,
    access_ttl_secs: i64,
    next_failure: Option<InjectedFailure>,
}

/// Shared mock state. Cloning shares the same data.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<MockStateInner>,
}

struct MockStateInner {
    data: Mutex<MockData>,
    knobs: Mutex<Knobs>,
    requests: Mutex<Vec<RecordedRequest>>,
    refresh_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    /// State with one customer, a small catalog and a few coupons.
    #[must_use]
    pub fn seeded() -> Self {
        let customer = AuthUser {
            id: UserId::new("user_1"),
            email: Email::parse(CUSTOMER_EMAIL).expect("seed email is valid"),
            first_name: Some("Rahim".to_string()),
            last_name: Some("Uddin".to_string()),
            role: UserRole::Customer,
        };
        let accounts = HashMap::from([(
            CUSTOMER_EMAIL.to_string(),
            Account {
                user: customer,
                password: CUSTOMER_PASSWORD.to_string(),
            },
        )]);

        let products = vec![
            product("home", "p1", "Nakshi Kantha", "nakshi-kantha", 500, None),
            product("clothing", "p2", "Jamdani Saree", "jamdani-saree", 4500, Some(5000)),
            product("home", "p3", "Clay Teapot", "clay-teapot", 250, None),
            product("clothing", "p4", "Cotton Panjabi", "cotton-panjabi", 1800, None),
            product("home", "p5", "Jute Basket", "jute-basket", 350, None),
        ];

        let now = Utc::now();
        let coupons = [
            coupon("SAVE10", DiscountType::Percentage, 10, None, Some(200)),
            coupon("FLAT100", DiscountType::Fixed, 100, Some(300), None),
            Coupon {
                end_date: now - ChronoDuration::days(1),
                ..coupon("EXPIRED", DiscountType::Fixed, 50, None, None)
            },
            Coupon {
                usage_limit_per_user: Some(1),
                ..coupon("ONCE", DiscountType::Fixed, 75, None, None)
            },
        ]
        .into_iter()
        .map(|coupon| (coupon.code.clone(), coupon))
        .collect();

        Self {
            inner: Arc::new(MockStateInner {
                data: Mutex::new(MockData {
                    accounts,
                    access_tokens: HashMap::new(),
                    refresh_tokens: HashMap::new(),
                    carts: HashMap::new(),
                    products,
                    coupons,
                    coupon_uses: HashMap::new(),
                }),
                knobs: Mutex::new(Knobs {
                    refresh_delay: Duration::ZERO,
                    fail_refresh: false,
                    access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
                    next_failure: None,
                }),
                requests: Mutex::new(Vec::new()),
                refresh_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn data(&self) -> MutexGuard<'_, MockData> {
        lock(&self.inner.data)
    }

    // =========================================================================
    // Knobs
    // =========================================================================

    /// Delay every `/auth/refresh` response.
    pub fn set_refresh_delay(&self, delay: Duration) {
        lock(&self.inner.knobs).refresh_delay = delay;
    }

    /// Make `/auth/refresh` reject every token.
    pub fn fail_refresh(&self, fail: bool) {
        lock(&self.inner.knobs).fail_refresh = fail;
    }

    /// Lifetime (`expiresIn`) of access tokens issued from now on.
    pub fn set_access_ttl(&self, secs: i64) {
        lock(&self.inner.knobs).access_ttl_secs = secs;
    }

    /// Fail the next request outside `/auth`.
    pub fn inject_failure(&self, failure: InjectedFailure) {
        lock(&self.inner.knobs).next_failure = Some(failure);
    }

    /// Revoke every access token server-side; refresh tokens stay valid.
    pub fn invalidate_access_tokens(&self) {
        self.data().access_tokens.clear();
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.data().coupons.insert(coupon.code.clone(), coupon);
    }

    /// Count one past redemption of `code` by the account `email`.
    pub fn record_coupon_use(&self, email: &str, code: &str) {
        let mut data = self.data();
        let Some(user_id) = data.accounts.get(email).map(|account| account.user.id.clone()) else {
            return;
        };
        *data
            .coupon_uses
            .entry((user_id, code.to_string()))
            .or_insert(0) += 1;
    }

    pub(crate) fn refresh_delay(&self) -> Duration {
        lock(&self.inner.knobs).refresh_delay
    }

    pub(crate) fn refresh_fails(&self) -> bool {
        lock(&self.inner.knobs).fail_refresh
    }

    pub(crate) fn take_failure(&self) -> Option<InjectedFailure> {
        lock(&self.inner.knobs).next_failure.take()
    }

    // =========================================================================
    // Observations
    // =========================================================================

    /// How many times `/auth/refresh` was called.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn count_refresh_call(&self) {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Every request received, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner.requests).clone()
    }

    /// Requests received for one path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    pub(crate) fn record(&self, request: RecordedRequest) {
        lock(&self.inner.requests).push(request);
    }

    /// The server-side cart of an account, if one was created.
    #[must_use]
    pub fn cart_of(&self, email: &str) -> Option<Cart> {
        let data = self.data();
        let user_id = &data.accounts.get(email)?.user.id;
        data.carts.get(user_id).cloned()
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    pub(crate) fn issue_tokens(&self, user_id: &UserId) -> AuthTokens {
        let access_ttl = lock(&self.inner.knobs).access_ttl_secs;
        let tokens = AuthTokens {
            access_token: format!("at_{}", Uuid::new_v4().simple()),
            refresh_token: format!("rt_{}", Uuid::new_v4().simple()),
            expires_in: Some(access_ttl),
            refresh_expires_in: Some(REFRESH_TTL_SECS),
        };

        let mut data = self.data();
        data.access_tokens
            .insert(tokens.access_token.clone(), user_id.clone());
        data.refresh_tokens
            .insert(tokens.refresh_token.clone(), user_id.clone());
        tokens
    }
}

impl MockData {
    pub(crate) fn cart_for(&mut self, user_id: &UserId) -> &mut Cart {
        self.carts
            .entry(user_id.clone())
            .or_insert_with(|| Cart::empty(CartId::new(format!("cart_{user_id}"))))
    }

    pub(crate) fn product(&self, product_id: &ProductId) -> Option<&ProductSummary> {
        self.products
            .iter()
            .map(|(_, product)| product)
            .find(|product| &product.id == product_id)
    }
}

fn product(
    category: &str,
    id: &str,
    name: &str,
    slug: &str,
    price: i64,
    compare_at: Option<i64>,
) -> (String, ProductSummary) {
    (
        category.to_string(),
        ProductSummary {
            id: ProductId::new(id),
            name: name.to_string(),
            slug: slug.to_string(),
            price: Decimal::from(price),
            compare_at_price: compare_at.map(Decimal::from),
            stock: Some(10),
            images: vec![format!("https://cdn.example.com/{slug}.jpg")],
        },
    )
}

fn coupon(
    code: &str,
    discount_type: DiscountType,
    value: i64,
    min_order: Option<i64>,
    max_discount: Option<i64>,
) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: CouponId::new(format!("coupon_{}", code.to_lowercase())),
        code: code.to_string(),
        discount_type,
        value: Decimal::from(value),
        min_order_amount: min_order.map(Decimal::from),
        max_discount: max_discount.map(Decimal::from),
        start_date: now - ChronoDuration::days(30),
        end_date: now + ChronoDuration::days(30),
        usage_limit: None,
        usage_count: 0,
        usage_limit_per_user: None,
        is_active: true,
    }
}
