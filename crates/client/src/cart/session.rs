//! Optimistic cart session.
//!
//! Every mutation follows the same shape:
//!
//! 1. wait for this session's turn (operations run one at a time, FIFO)
//! 2. snapshot the cart and apply the local change immediately
//! 3. call the API
//! 4. on success replace the cart with the server's; on failure, or if the
//!    operation is dropped mid-flight, restore the snapshot verbatim
//!
//! Derived totals are recomputed with [`Cart::recalculate`] after every local
//! change, so `subtotal`, `total` and `item_count` always agree with the item
//! list.

use std::future::Future;
use std::sync::Arc;

use ecom_core::{AddItemRequest, Cart, CartItemId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use super::{CartApi, CartClient};
use crate::error::Result;

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// `None` until the first load.
    pub cart: Option<Cart>,
    pub is_loading: bool,
    pub is_updating: bool,
    /// Whether the cart drawer is shown.
    pub is_open: bool,
}

/// Client-side mirror of the server cart with optimistic mutations.
pub struct CartSession<A: CartApi = CartClient> {
    inner: Arc<CartSessionInner<A>>,
}

struct CartSessionInner<A> {
    api: A,
    state: watch::Sender<CartState>,
    /// Serializes operations. Tokio's mutex hands out the lock in FIFO order.
    queue: Mutex<()>,
}

impl<A: CartApi> Clone for CartSession<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: CartApi> CartSession<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartSessionInner {
                api,
                state,
                queue: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// The cart as currently shown (optimistic changes included).
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.inner.state.borrow().cart.clone()
    }

    /// Receive every state change, optimistic ones included.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Drawer
    // =========================================================================

    pub fn open(&self) {
        self.inner.state.send_if_modified(|state| !std::mem::replace(&mut state.is_open, true));
    }

    pub fn close(&self) {
        self.inner.state.send_if_modified(|state| std::mem::replace(&mut state.is_open, false));
    }

    pub fn toggle(&self) {
        self.inner.state.send_modify(|state| state.is_open = !state.is_open);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the server cart and replace local state with it.
    ///
    /// # Errors
    ///
    /// Returns the API error; local state is left as it was.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Cart> {
        let _turn = self.inner.queue.lock().await;

        let loading = Loading::start(&self.inner.state);
        let cart = self.inner.api.get_cart().await?;
        loading.finish(&cart);
        Ok(cart)
    }

    /// Add a product to the cart.
    ///
    /// A line already holding the same product and variant is bumped
    /// locally. A new product has no local line until the server answers,
    /// but the item count moves immediately.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous cart.
    #[instrument(skip(self), fields(product_id = %request.product_id, quantity = request.quantity))]
    pub async fn add_item(&self, request: &AddItemRequest) -> Result<Cart> {
        let product_id = request.product_id.clone();
        let variant_id = request.variant_id.clone();
        let quantity = request.quantity;

        self.mutate(
            move |cart| {
                let existing = cart
                    .items
                    .iter_mut()
                    .find(|item| item.matches(&product_id, variant_id.as_ref()));
                match existing {
                    Some(item) => {
                        item.set_quantity(item.quantity.saturating_add(quantity));
                        cart.recalculate();
                    }
                    None => cart.item_count = cart.item_count.saturating_add(quantity),
                }
            },
            self.inner.api.add_item(request),
        )
        .await
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous cart.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(&self, item_id: &CartItemId, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return self.remove_item(item_id).await;
        }

        let target = item_id.clone();
        self.mutate(
            move |cart| {
                if let Some(item) = cart.item_mut(&target) {
                    item.set_quantity(quantity);
                }
                cart.recalculate();
            },
            self.inner.api.update_item(item_id, quantity),
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: &CartItemId) -> Result<Cart> {
        let target = item_id.clone();
        self.mutate(
            move |cart| {
                cart.items.retain(|item| item.id != target);
                cart.recalculate();
            },
            self.inner.api.remove_item(item_id),
        )
        .await
    }

    /// Empty the cart, dropping any coupon.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous cart.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<Cart> {
        self.mutate(
            |cart| {
                cart.items.clear();
                drop_coupon(cart);
            },
            self.inner.api.clear(),
        )
        .await
    }

    /// Apply a coupon code. Not optimistic: the discount is only known once
    /// the server has validated the code.
    ///
    /// # Errors
    ///
    /// Returns the API error (e.g. `COUPON_EXPIRED`); the cart is unchanged.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<Cart> {
        self.mutate(|_| {}, self.inner.api.apply_coupon(code.trim())).await
    }

    /// Remove the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns the API error after restoring the previous cart.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self) -> Result<Cart> {
        self.mutate(drop_coupon, self.inner.api.remove_coupon()).await
    }

    /// Run one mutation: wait for our turn, apply `optimistic`, await
    /// `request`, then reconcile or roll back.
    async fn mutate<F, R>(&self, optimistic: F, request: R) -> Result<Cart>
    where
        F: FnOnce(&mut Cart),
        R: Future<Output = Result<Cart>>,
    {
        let _turn = self.inner.queue.lock().await;

        let mut rollback = Rollback::capture(&self.inner.state);
        self.inner.state.send_modify(|state| {
            if let Some(cart) = state.cart.as_mut() {
                optimistic(cart);
            }
            state.is_updating = true;
        });

        match request.await {
            Ok(cart) => {
                rollback.disarm();
                self.inner.state.send_modify(|state| {
                    state.cart = Some(cart.clone());
                    state.is_updating = false;
                });
                debug!(item_count = cart.item_count, total = %cart.total, "cart confirmed");
                Ok(cart)
            }
            Err(e) => {
                warn!(error = %e, "cart update failed, rolling back");
                drop(rollback);
                Err(e)
            }
        }
    }
}

impl<A: CartApi> std::fmt::Debug for CartSession<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

fn drop_coupon(cart: &mut Cart) {
    cart.discount = Decimal::ZERO;
    cart.coupon_code = None;
    cart.recalculate();
}

/// Holds `is_loading` for the duration of a load. Dropping it unfinished
/// (failed or abandoned load) clears the flag and keeps the cart.
struct Loading<'a> {
    state: &'a watch::Sender<CartState>,
    loaded: Option<Cart>,
}

impl<'a> Loading<'a> {
    fn start(state: &'a watch::Sender<CartState>) -> Self {
        state.send_modify(|state| state.is_loading = true);
        Self {
            state,
            loaded: None,
        }
    }

    fn finish(mut self, cart: &Cart) {
        self.loaded = Some(cart.clone());
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        let loaded = self.loaded.take();
        self.state.send_modify(|state| {
            if let Some(cart) = loaded {
                state.cart = Some(cart);
            }
            state.is_loading = false;
        });
    }
}

/// Restores the captured cart when dropped, unless disarmed.
///
/// Dropping covers both a rejected request and a caller that abandons the
/// operation future while the request is in flight.
struct Rollback<'a> {
    state: &'a watch::Sender<CartState>,
    snapshot: Option<Option<Cart>>,
}

impl<'a> Rollback<'a> {
    fn capture(state: &'a watch::Sender<CartState>) -> Self {
        let snapshot = state.borrow().cart.clone();
        Self {
            state,
            snapshot: Some(snapshot),
        }
    }

    fn disarm(&mut self) {
        self.snapshot = None;
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.state.send_modify(|state| {
                state.cart = snapshot;
                state.is_updating = false;
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use ecom_core::{CartId, CartItem, ErrorBody, ErrorCategory};
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::error::ClientError;

    /// In-memory cart server. Unit prices: `p1` = 500, anything else = 250.
    struct FakeCartApi {
        cart: StdMutex<Cart>,
        calls: StdMutex<VecDeque<String>>,
        fail_next: AtomicBool,
        gated: AtomicBool,
        gate: Semaphore,
    }

    impl FakeCartApi {
        fn new() -> Self {
            Self {
                cart: StdMutex::new(Cart::empty(CartId::new("cart-1"))),
                calls: StdMutex::new(VecDeque::new()),
                fail_next: AtomicBool::new(false),
                gated: AtomicBool::new(false),
                gate: Semaphore::new(0),
            }
        }

        fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }

        /// Hold every request until `release` is called.
        fn hold(&self) {
            self.gated.store(true, Ordering::SeqCst);
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().cloned().collect()
        }

        async fn respond(&self, call: String, apply: impl FnOnce(&mut Cart)) -> Result<Cart> {
            self.calls.lock().unwrap().push_back(call);
            if self.gated.load(Ordering::SeqCst) {
                self.gate.acquire().await.unwrap().forget();
            }
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(ClientError::Api(ErrorBody::new(
                    ErrorCategory::Internal,
                    "injected failure",
                )));
            }
            let mut cart = self.cart.lock().unwrap();
            apply(&mut cart);
            cart.recalculate();
            Ok(cart.clone())
        }
    }

    impl CartApi for FakeCartApi {
        async fn get_cart(&self) -> Result<Cart> {
            self.respond("get".to_string(), |_| {}).await
        }

        async fn add_item(&self, request: &AddItemRequest) -> Result<Cart> {
            let request = request.clone();
            self.respond(format!("add {}", request.product_id), move |cart| {
                if let Some(item) = cart
                    .items
                    .iter_mut()
                    .find(|item| item.matches(&request.product_id, request.variant_id.as_ref()))
                {
                    item.set_quantity(item.quantity + request.quantity);
                    return;
                }
                let unit_price = if request.product_id.as_str() == "p1" {
                    Decimal::from(500)
                } else {
                    Decimal::from(250)
                };
                cart.items.push(CartItem {
                    id: CartItemId::new(format!("item-{}", request.product_id)),
                    product_id: request.product_id.clone(),
                    variant_id: request.variant_id.clone(),
                    name: format!("Product {}", request.product_id),
                    image: None,
                    unit_price,
                    quantity: request.quantity,
                    line_total: unit_price * Decimal::from(request.quantity),
                });
            })
            .await
        }

        async fn update_item(&self, item_id: &CartItemId, quantity: u32) -> Result<Cart> {
            let item_id = item_id.clone();
            self.respond(format!("update {item_id} {quantity}"), move |cart| {
                if let Some(item) = cart.item_mut(&item_id) {
                    item.set_quantity(quantity);
                }
            })
            .await
        }

        async fn remove_item(&self, item_id: &CartItemId) -> Result<Cart> {
            let item_id = item_id.clone();
            self.respond(format!("remove {item_id}"), move |cart| {
                cart.items.retain(|item| item.id != item_id);
            })
            .await
        }

        async fn clear(&self) -> Result<Cart> {
            self.respond("clear".to_string(), |cart| {
                cart.items.clear();
                cart.discount = Decimal::ZERO;
                cart.coupon_code = None;
            })
            .await
        }

        async fn apply_coupon(&self, code: &str) -> Result<Cart> {
            let code = code.to_string();
            self.respond(format!("coupon {code}"), move |cart| {
                cart.discount = Decimal::from(100);
                cart.coupon_code = Some(code);
            })
            .await
        }

        async fn remove_coupon(&self) -> Result<Cart> {
            self.respond("uncoupon".to_string(), |cart| {
                cart.discount = Decimal::ZERO;
                cart.coupon_code = None;
            })
            .await
        }
    }

    fn assert_totals_consistent(cart: &Cart) {
        let subtotal: Decimal = cart.items.iter().map(|item| item.line_total).sum();
        let count: u32 = cart.items.iter().map(|item| item.quantity).sum();
        assert_eq!(cart.subtotal, subtotal);
        assert_eq!(cart.item_count, count);
        assert_eq!(cart.total, (cart.subtotal - cart.discount).max(Decimal::ZERO));
    }

    async fn loaded_session() -> CartSession<FakeCartApi> {
        let session = CartSession::new(FakeCartApi::new());
        session.load().await.unwrap();
        session
    }

    /// Wait until the optimistic change of an in-flight operation is visible.
    async fn wait_for_update(session: &CartSession<FakeCartApi>) {
        let mut rx = session.subscribe();
        rx.wait_for(|state| state.is_updating).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_then_failed_remove_restores_snapshot() {
        let session = loaded_session().await;

        let cart = session.add_item(&AddItemRequest::new("p1", 2)).await.unwrap();
        assert_eq!(cart.item_count, 2);
        assert_eq!(cart.subtotal, Decimal::from(1000));
        assert_totals_consistent(&cart);

        let before = session.state();
        session.api().fail_next();
        let result = session.remove_item(&CartItemId::new("item-p1")).await;

        assert!(result.is_err());
        assert_eq!(session.state(), before);
    }

    #[tokio::test]
    async fn test_optimistic_bump_of_existing_line() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 1)).await.unwrap();

        session.api().hold();
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.add_item(&AddItemRequest::new("p1", 2)).await })
        };
        wait_for_update(&session).await;

        let optimistic = session.cart().unwrap();
        assert_eq!(optimistic.items[0].quantity, 3);
        assert_eq!(optimistic.subtotal, Decimal::from(1500));
        assert_totals_consistent(&optimistic);

        session.api().release();
        let confirmed = task.await.unwrap().unwrap();
        assert_eq!(confirmed.item_count, 3);
        assert!(!session.state().is_updating);
    }

    #[tokio::test]
    async fn test_optimistic_new_product_only_moves_count() {
        let session = loaded_session().await;

        session.api().hold();
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.add_item(&AddItemRequest::new("p2", 3)).await })
        };
        wait_for_update(&session).await;

        let optimistic = session.cart().unwrap();
        assert!(optimistic.items.is_empty());
        assert_eq!(optimistic.item_count, 3);

        session.api().release();
        let confirmed = task.await.unwrap().unwrap();
        assert_eq!(confirmed.items.len(), 1);
        assert_eq!(confirmed.total, Decimal::from(750));
    }

    #[tokio::test]
    async fn test_update_quantity_recomputes_and_rolls_back() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 1)).await.unwrap();
        let item_id = CartItemId::new("item-p1");

        let cart = session.update_item_quantity(&item_id, 4).await.unwrap();
        assert_eq!(cart.item_count, 4);
        assert_eq!(cart.subtotal, Decimal::from(2000));
        assert_totals_consistent(&cart);

        let before = session.state();
        session.api().fail_next();
        assert!(session.update_item_quantity(&item_id, 9).await.is_err());
        assert_eq!(session.state(), before);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 2)).await.unwrap();

        let cart = session
            .update_item_quantity(&CartItemId::new("item-p1"), 0)
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert_eq!(session.api().calls().last().unwrap(), "remove item-p1");
    }

    #[tokio::test]
    async fn test_dropped_operation_rolls_back() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 2)).await.unwrap();
        let before = session.state();

        session.api().hold();
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.clear_cart().await })
        };
        wait_for_update(&session).await;
        assert!(session.cart().unwrap().is_empty());

        task.abort();
        let _ = task.await;
        assert_eq!(session.state(), before);
    }

    #[tokio::test]
    async fn test_clear_cart_drops_coupon() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 1)).await.unwrap();
        session.apply_coupon("SAVE100").await.unwrap();

        let cart = session.clear_cart().await.unwrap();
        assert_eq!(cart.discount, Decimal::ZERO);
        assert_eq!(cart.coupon_code, None);
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_failed_coupon_leaves_cart_untouched() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 1)).await.unwrap();
        let before = session.state();

        session.api().fail_next();
        assert!(session.apply_coupon("EXPIRED").await.is_err());
        assert_eq!(session.state(), before);

        let cart = session.apply_coupon("  SAVE100 ").await.unwrap();
        assert_eq!(cart.coupon_code.as_deref(), Some("SAVE100"));
        assert_eq!(cart.total, Decimal::from(400));
    }

    #[tokio::test]
    async fn test_remove_coupon_is_optimistic() {
        let session = loaded_session().await;
        session.add_item(&AddItemRequest::new("p1", 1)).await.unwrap();
        session.apply_coupon("SAVE100").await.unwrap();

        session.api().hold();
        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.remove_coupon().await })
        };
        wait_for_update(&session).await;

        let optimistic = session.cart().unwrap();
        assert_eq!(optimistic.discount, Decimal::ZERO);
        assert_eq!(optimistic.total, Decimal::from(500));

        session.api().release();
        let confirmed = task.await.unwrap().unwrap();
        assert_eq!(confirmed.coupon_code, None);
    }

    #[tokio::test]
    async fn test_concurrent_mutations_run_in_order() {
        let session = loaded_session().await;

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.add_item(&AddItemRequest::new("p1", 1)).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let session = session.clone();
            tokio::spawn(async move { session.add_item(&AddItemRequest::new("p1", 1)).await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let cart = session.cart().unwrap();
        assert_eq!(cart.item_count, 2);
        assert_eq!(cart.items.len(), 1);
        assert_totals_consistent(&cart);
        assert_eq!(session.api().calls(), vec!["get", "add p1", "add p1"]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_state() {
        let session = CartSession::new(FakeCartApi::new());
        session.api().fail_next();

        assert!(session.load().await.is_err());
        let state = session.state();
        assert_eq!(state.cart, None);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_dropped_load_clears_loading_flag() {
        let session = CartSession::new(FakeCartApi::new());
        session.api().hold();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.load().await })
        };
        let mut rx = session.subscribe();
        rx.wait_for(|state| state.is_loading).await.unwrap();

        task.abort();
        let _ = task.await;
        let state = session.state();
        assert!(!state.is_loading);
        assert_eq!(state.cart, None);
    }

    /// One cart operation over products `p1`..`p3`.
    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, u32),
        Update(usize, u32),
        Remove(usize),
        Clear,
        ApplyCoupon,
        RemoveCoupon,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1..=3usize, 1..5u32).prop_map(|(product, quantity)| Op::Add(product, quantity)),
            (1..=3usize, 0..5u32).prop_map(|(product, quantity)| Op::Update(product, quantity)),
            (1..=3usize).prop_map(Op::Remove),
            Just(Op::Clear),
            Just(Op::ApplyCoupon),
            Just(Op::RemoveCoupon),
        ]
    }

    async fn run(session: &CartSession<FakeCartApi>, op: &Op) -> Result<Cart> {
        let item = |product: usize| CartItemId::new(format!("item-p{product}"));
        match op {
            Op::Add(product, quantity) => {
                session
                    .add_item(&AddItemRequest::new(format!("p{product}"), *quantity))
                    .await
            }
            Op::Update(product, quantity) => {
                session.update_item_quantity(&item(*product), *quantity).await
            }
            Op::Remove(product) => session.remove_item(&item(*product)).await,
            Op::Clear => session.clear_cart().await,
            Op::ApplyCoupon => session.apply_coupon("SAVE100").await,
            Op::RemoveCoupon => session.remove_coupon().await,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_any_operation_sequence_keeps_cart_consistent(
            ops in prop::collection::vec((op(), any::<bool>()), 1..24),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let session = loaded_session().await;

                for (op, fail) in &ops {
                    let before = session.state();
                    if *fail {
                        session.api().fail_next();
                    }

                    let result = run(&session, op).await;
                    let after = session.state();

                    prop_assert_eq!(result.is_err(), *fail);
                    if *fail {
                        prop_assert_eq!(&after, &before);
                    }
                    prop_assert!(!after.is_updating);

                    let cart = after.cart.as_ref().unwrap();
                    let subtotal: Decimal = cart.items.iter().map(|item| item.line_total).sum();
                    let count: u32 = cart.items.iter().map(|item| item.quantity).sum();
                    prop_assert_eq!(cart.subtotal, subtotal);
                    prop_assert_eq!(cart.item_count, count);
                    prop_assert_eq!(cart.total, (cart.subtotal - cart.discount).max(Decimal::ZERO));
                    let server_cart = session.api().cart.lock().unwrap().clone();
                    prop_assert_eq!(cart, &server_cart);
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }

    #[test]
    fn test_drawer_toggles() {
        let session = CartSession::new(FakeCartApi::new());
        session.open();
        assert!(session.state().is_open);
        session.toggle();
        assert!(!session.state().is_open);
        session.toggle();
        session.close();
        assert!(!session.state().is_open);
    }
}
