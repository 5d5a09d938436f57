//! Auth session: current user, login/register/logout, proactive refresh.
//!
//! The session owns the signed-in user and publishes it on a `watch`
//! channel. A background [`RefreshTimer`] rotates tokens shortly before the
//! access cookie lapses and clears the user when the API client reports that
//! a refresh failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ecom_core::{AuthPayload, AuthUser, Email, LoginRequest, RegisterRequest};
use reqwest::Method;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, Result};
use crate::http::{ApiClient, RefreshError, RequestOptions, SessionEvent};

/// The proactive refresh never fires sooner than this after scheduling.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Observable auth state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub is_loading: bool,
}

/// Signed-in user session over an [`ApiClient`].
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

struct AuthSessionInner {
    api: ApiClient,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(AuthSessionInner { api, state }),
        }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// The signed-in user, if the session is still alive.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        if !self.api().tokens().has_session() {
            return None;
        }
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn set_user(&self, user: Option<AuthUser>) {
        self.inner.state.send_modify(|state| {
            state.user = user;
            state.is_loading = false;
        });
    }

    fn set_loading(&self) {
        self.inner.state.send_modify(|state| state.is_loading = true);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resume a persisted session by loading `/auth/me`.
    ///
    /// Returns `Ok(None)` when there are no tokens or the API no longer
    /// accepts them; in the latter case the tokens are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error for network or server failures. Tokens are kept so a
    /// later attempt can still succeed.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Option<AuthUser>> {
        if !self.api().tokens().has_session() {
            self.set_user(None);
            return Ok(None);
        }

        self.set_loading();
        match self.api().get::<AuthUser>("auth/me").await {
            Ok(user) => {
                debug!(user_id = %user.id, "session restored");
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) if is_auth_failure(&e) => {
                info!(error = %e, "stored session rejected, signing out");
                self.api().sign_out()?;
                self.set_user(None);
                Ok(None)
            }
            Err(e) => {
                self.inner.state.send_modify(|state| state.is_loading = false);
                Err(e)
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidEmail` before any request if the address
    /// is malformed, or the API error for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser> {
        let request = LoginRequest {
            email: Email::parse(email)?,
            password: password.to_string(),
        };
        self.authenticate("auth/login", &request).await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns the API error, e.g. `DUPLICATE_ENTRY` for a taken address.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthUser> {
        self.authenticate("auth/register", request).await
    }

    async fn authenticate<B: serde::Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthUser> {
        self.set_loading();
        let result = self
            .api()
            .send::<AuthPayload, B>(Method::POST, path, Some(body), RequestOptions::public())
            .await;

        let payload = match result {
            Ok(response) => response.data,
            Err(e) => {
                self.inner.state.send_modify(|state| state.is_loading = false);
                return Err(e);
            }
        };

        self.api().sign_in(&payload.tokens)?;
        info!(user_id = %payload.user.id, "signed in");
        self.set_user(Some(payload.user.clone()));
        Ok(payload.user)
    }

    /// Sign out. The server call is best effort; local tokens are always
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cookie store cannot be cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if self.api().tokens().has_session()
            && let Err(e) = self
                .api()
                .send_without_content::<()>(
                    Method::POST,
                    "auth/logout",
                    None,
                    RequestOptions::authenticated().no_retry(),
                )
                .await
        {
            warn!(error = %e, "server logout failed, clearing local session anyway");
        }

        self.api().sign_out()?;
        self.set_user(None);
        Ok(())
    }

    // =========================================================================
    // Background refresh
    // =========================================================================

    /// Spawn the proactive refresh loop. It stops when the returned handle is
    /// dropped.
    ///
    /// The loop also listens for [`SessionEvent::Expired`] so a refresh that
    /// fails inside any request clears the user here.
    #[must_use]
    pub fn start_refresh_timer(&self) -> RefreshTimer {
        let events = self.api().subscribe();
        let handle = tokio::spawn(run_refresh_timer(self.clone(), events));
        RefreshTimer { handle }
    }

    fn next_refresh_delay(&self) -> Option<Duration> {
        let tokens = self.api().tokens();
        refresh_delay(
            tokens.access_expires_at(),
            tokens.has_session(),
            self.api().config().refresh_lead,
            Utc::now(),
        )
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Handle to the background refresh task; aborts the task on drop.
#[derive(Debug)]
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// Stop the timer now.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_refresh_timer(session: AuthSession, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        let delay = session.next_refresh_delay();
        if let Some(delay) = delay {
            debug!(delay_secs = delay.as_secs(), "next proactive refresh scheduled");
        }

        tokio::select! {
            () = sleep_or_wait(delay) => {
                match session.api().refresh_session_token().await {
                    Ok(_) => debug!("proactive refresh succeeded"),
                    // The client already cleared tokens and emitted Expired
                    Err(e) => warn!(error = %e, "proactive refresh failed"),
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Expired | SessionEvent::SignedOut) => session.set_user(None),
                Ok(SessionEvent::SignedIn | SessionEvent::Refreshed) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "session events lagged, rescheduling");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

async fn sleep_or_wait(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

/// How long until the proactive refresh should fire, or `None` if there is
/// no session to keep alive.
fn refresh_delay(
    access_expires_at: Option<DateTime<Utc>>,
    has_session: bool,
    lead: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if !has_session {
        return None;
    }
    let Some(expires_at) = access_expires_at else {
        return Some(MIN_REFRESH_DELAY);
    };

    let lead = chrono::Duration::from_std(lead).unwrap_or(chrono::Duration::zero());
    let delay = (expires_at - lead - now).to_std().unwrap_or(Duration::ZERO);
    Some(delay.max(MIN_REFRESH_DELAY))
}

/// Whether the stored session is gone. Every completed refresh failure has
/// already cleared the tokens; an abandoned one left them untouched.
fn is_auth_failure(error: &ClientError) -> bool {
    match error {
        ClientError::SessionExpired(RefreshError::Abandoned) => false,
        ClientError::SessionExpired(_) | ClientError::NotAuthenticated => true,
        other => other.status() == Some(401),
    }
}
