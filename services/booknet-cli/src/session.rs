//! Session context
//!
//! Pure state machine: receives events, returns (new_state, action).
//! `SessionContext` executes the I/O implied by each action and publishes
//! every new state on a watch channel.
//!
//! Lifecycle:
//! 1. `start()` reads the credential store. Empty → signed out.
//! 2. Stored session → verify-token; dead token → one refresh; failed
//!    refresh → teardown.
//! 3. While signed in, the same verify → refresh → teardown check runs on
//!    every revalidation tick.
//! 4. Login and registration raise short-lived "just logged in" flags that a
//!    timer lowers again.
//! 5. A `LoginRequired` signal from the API client resets the state.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use booknet_api::{ApiClient, SessionSignal};
use booknet_auth::{LoginForm, RegistrationForm, UserProfile};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Reactive session snapshot.
///
/// `is_authenticated` implies `user` is set and the credential store holds
/// both tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_just_logged_in: bool,
    pub is_after_registration: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            is_just_logged_in: false,
            is_after_registration: false,
        }
    }
}

impl SessionState {
    fn signed_out() -> Self {
        Self {
            is_loading: false,
            ..Self::default()
        }
    }

    fn signed_in(user: UserProfile) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            is_just_logged_in: false,
            is_after_registration: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated && self.user.as_ref().is_some_and(UserProfile::is_admin)
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    /// Credential store read at startup
    StoreLoaded {
        user: Option<UserProfile>,
        has_tokens: bool,
    },
    /// verify-token answered
    Verified(bool),
    /// Refresh exchanged the tokens; carries the freshest cached profile
    Refreshed(Option<UserProfile>),
    RefreshFailed,
    /// Periodic revalidation timer fired
    RevalidateTick,
    /// Interactive login or registration succeeded
    LoggedIn {
        user: UserProfile,
        registered: bool,
    },
    /// Celebration timer expired
    CelebrationOver,
    LoggedOut,
    /// The API client tore the session down after a 401
    LoginRequired,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Call verify-token
    Verify,
    /// Exchange the refresh token
    Refresh,
    /// Ensure the revalidation timer runs; optionally start the celebration
    /// timer
    Authenticated { celebrate: bool },
    /// Clear the store and stop timers
    TearDown,
    /// Stop timers; the store is already clear
    Stop,
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: SessionState, event: SessionEvent) -> (SessionState, SessionAction) {
    match event {
        SessionEvent::StoreLoaded {
            user: Some(user),
            has_tokens: true,
        } => (
            SessionState {
                user: Some(user),
                is_loading: true,
                ..SessionState::default()
            },
            SessionAction::Verify,
        ),
        // A half-written session can't satisfy the invariant; drop it.
        SessionEvent::StoreLoaded {
            has_tokens: true, ..
        }
        | SessionEvent::StoreLoaded {
            user: Some(_), ..
        } => (SessionState::signed_out(), SessionAction::TearDown),
        SessionEvent::StoreLoaded { .. } => (SessionState::signed_out(), SessionAction::None),

        SessionEvent::Verified(true) => match state.user.clone() {
            Some(user) => {
                let next = SessionState {
                    is_just_logged_in: state.is_just_logged_in,
                    is_after_registration: state.is_after_registration,
                    ..SessionState::signed_in(user)
                };
                (next, SessionAction::Authenticated { celebrate: false })
            }
            None => (SessionState::signed_out(), SessionAction::TearDown),
        },
        SessionEvent::Verified(false) => (state, SessionAction::Refresh),

        SessionEvent::Refreshed(user) => match user.or(state.user.clone()) {
            Some(user) => {
                let next = SessionState {
                    is_just_logged_in: state.is_just_logged_in,
                    is_after_registration: state.is_after_registration,
                    ..SessionState::signed_in(user)
                };
                (next, SessionAction::Authenticated { celebrate: false })
            }
            None => (SessionState::signed_out(), SessionAction::TearDown),
        },
        SessionEvent::RefreshFailed => (SessionState::signed_out(), SessionAction::TearDown),

        SessionEvent::RevalidateTick if state.is_authenticated => (state, SessionAction::Verify),
        SessionEvent::RevalidateTick => (state, SessionAction::None),

        SessionEvent::LoggedIn { user, registered } => (
            SessionState {
                is_just_logged_in: true,
                is_after_registration: registered,
                ..SessionState::signed_in(user)
            },
            SessionAction::Authenticated { celebrate: true },
        ),
        SessionEvent::CelebrationOver => (
            SessionState {
                is_just_logged_in: false,
                is_after_registration: false,
                ..state
            },
            SessionAction::None,
        ),

        SessionEvent::LoggedOut | SessionEvent::LoginRequired => {
            (SessionState::signed_out(), SessionAction::Stop)
        }
    }
}

/// Timer settings for the session context.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimers {
    pub revalidate_every: Duration,
    pub celebrate_for: Duration,
}

#[derive(Default)]
struct Tasks {
    revalidation: Option<JoinHandle<()>>,
    celebration: Option<JoinHandle<()>>,
    signals: Option<JoinHandle<()>>,
}

impl Tasks {
    fn stop_timers(&mut self) {
        for handle in [self.revalidation.take(), self.celebration.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

/// Process-wide session state driver.
pub struct SessionContext {
    client: ApiClient,
    timers: SessionTimers,
    state: watch::Sender<SessionState>,
    tasks: Mutex<Tasks>,
    this: Weak<SessionContext>,
}

impl SessionContext {
    pub fn new(client: ApiClient, timers: SessionTimers) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            client,
            timers,
            state: watch::channel(SessionState::default()).0,
            tasks: Mutex::new(Tasks::default()),
            this: this.clone(),
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Load the stored session and check it with the server.
    pub async fn start(&self) {
        self.listen_for_signals();
        let store = self.client.store();
        let event = SessionEvent::StoreLoaded {
            user: store.user().await,
            has_tokens: store.credentials().await.is_some(),
        };
        self.apply(event).await;
    }

    pub async fn login(&self, form: &LoginForm) -> booknet_auth::Result<UserProfile> {
        let user = self.client.auth().login(form).await?;
        self.apply(SessionEvent::LoggedIn {
            user: user.clone(),
            registered: false,
        })
        .await;
        Ok(user)
    }

    pub async fn register(&self, form: &RegistrationForm) -> booknet_auth::Result<UserProfile> {
        let user = self.client.auth().register(form).await?;
        self.apply(SessionEvent::LoggedIn {
            user: user.clone(),
            registered: true,
        })
        .await;
        Ok(user)
    }

    pub async fn logout(&self) -> booknet_auth::Result<()> {
        let result = self.client.auth().logout().await;
        self.apply(SessionEvent::LoggedOut).await;
        result
    }

    /// Abort every background task.
    pub fn shutdown(&self) {
        let mut tasks = self.lock_tasks();
        tasks.stop_timers();
        if let Some(handle) = tasks.signals.take() {
            handle.abort();
        }
    }

    /// Run an event and every follow-up event its actions produce.
    async fn apply(&self, event: SessionEvent) {
        let mut next = Some(event);
        while let Some(event) = next {
            debug!(?event, "session event");
            let (state, action) = handle_event(self.state(), event);
            self.state.send_replace(state);
            next = self.execute(action).await;
        }
    }

    async fn execute(&self, action: SessionAction) -> Option<SessionEvent> {
        match action {
            SessionAction::Verify => {
                let alive = match self.client.auth().verify_token().await {
                    Ok(alive) => alive,
                    Err(e) => {
                        warn!(error = %e, "token verification failed");
                        false
                    }
                };
                Some(SessionEvent::Verified(alive))
            }
            SessionAction::Refresh => match self.client.auth().refresh_token().await {
                Ok(_) => Some(SessionEvent::Refreshed(self.client.store().user().await)),
                Err(e) => {
                    warn!(error = %e, "session refresh failed");
                    Some(SessionEvent::RefreshFailed)
                }
            },
            SessionAction::Authenticated { celebrate } => {
                self.ensure_revalidation();
                if celebrate {
                    self.start_celebration();
                }
                None
            }
            SessionAction::TearDown => {
                // Clear before stopping timers: this may run on the
                // revalidation task itself, which dies at its next await.
                if let Err(e) = self.client.store().clear().await {
                    warn!(error = %e, "failed to clear session store");
                }
                self.lock_tasks().stop_timers();
                info!("session ended, login required");
                None
            }
            SessionAction::Stop => {
                self.lock_tasks().stop_timers();
                None
            }
            SessionAction::None => None,
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_revalidation(&self) {
        let mut tasks = self.lock_tasks();
        if tasks
            .revalidation
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            return;
        }
        let this = self.this.clone();
        let every = self.timers.revalidate_every;
        tasks.revalidation = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick is immediate; the session was just checked.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(ctx) = this.upgrade() else { return };
                debug!("revalidating session");
                ctx.apply(SessionEvent::RevalidateTick).await;
            }
        }));
    }

    fn start_celebration(&self) {
        let mut tasks = self.lock_tasks();
        if let Some(handle) = tasks.celebration.take() {
            handle.abort();
        }
        let this = self.this.clone();
        let duration = self.timers.celebrate_for;
        tasks.celebration = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(ctx) = this.upgrade() {
                ctx.apply(SessionEvent::CelebrationOver).await;
            }
        }));
    }

    fn listen_for_signals(&self) {
        let mut tasks = self.lock_tasks();
        if tasks.signals.is_some() {
            return;
        }
        let mut signals = self.client.subscribe();
        let this = self.this.clone();
        tasks.signals = Some(tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(SessionSignal::LoginRequired) => {
                        let Some(ctx) = this.upgrade() else { return };
                        ctx.apply(SessionEvent::LoginRequired).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }));
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use booknet_auth::{CredentialStore, Credentials, Role};
    use serde_json::json;
    use tokio::net::TcpListener;

    fn user() -> UserProfile {
        UserProfile {
            id: 5,
            username: "a".into(),
            email: "a@booknet.io".into(),
            role: Role::User,
            first_name: None,
            last_name: None,
            created_at: None,
        }
    }

    // --- pure transitions ---

    #[test]
    fn empty_store_signs_out_without_io() {
        let (state, action) = handle_event(
            SessionState::default(),
            SessionEvent::StoreLoaded {
                user: None,
                has_tokens: false,
            },
        );
        assert!(!state.is_loading);
        assert!(!state.is_authenticated);
        assert_eq!(action, SessionAction::None);
    }

    #[test]
    fn stored_session_is_verified_first() {
        let (state, action) = handle_event(
            SessionState::default(),
            SessionEvent::StoreLoaded {
                user: Some(user()),
                has_tokens: true,
            },
        );
        assert!(state.is_loading);
        assert!(!state.is_authenticated);
        assert_eq!(action, SessionAction::Verify);
    }

    #[test]
    fn partial_session_is_torn_down() {
        let (state, action) = handle_event(
            SessionState::default(),
            SessionEvent::StoreLoaded {
                user: None,
                has_tokens: true,
            },
        );
        assert!(!state.is_authenticated);
        assert_eq!(action, SessionAction::TearDown);
    }

    #[test]
    fn dead_token_refreshes_then_tears_down() {
        let loading = SessionState {
            user: Some(user()),
            ..SessionState::default()
        };
        let (state, action) = handle_event(loading, SessionEvent::Verified(false));
        assert_eq!(action, SessionAction::Refresh);

        let (state, action) = handle_event(state, SessionEvent::RefreshFailed);
        assert_eq!(action, SessionAction::TearDown);
        assert_eq!(state, SessionState::signed_out());
    }

    #[test]
    fn refresh_success_authenticates_with_cached_user() {
        let loading = SessionState {
            user: Some(user()),
            ..SessionState::default()
        };
        let (state, action) = handle_event(loading, SessionEvent::Refreshed(None));
        assert!(state.is_authenticated);
        assert_eq!(state.user.unwrap().id, 5);
        assert_eq!(action, SessionAction::Authenticated { celebrate: false });
    }

    #[test]
    fn tick_only_verifies_when_authenticated() {
        let (_, action) = handle_event(SessionState::signed_out(), SessionEvent::RevalidateTick);
        assert_eq!(action, SessionAction::None);

        let (_, action) =
            handle_event(SessionState::signed_in(user()), SessionEvent::RevalidateTick);
        assert_eq!(action, SessionAction::Verify);
    }

    #[test]
    fn login_raises_flags_until_celebration_ends() {
        let (state, action) = handle_event(
            SessionState::signed_out(),
            SessionEvent::LoggedIn {
                user: user(),
                registered: true,
            },
        );
        assert!(state.is_authenticated);
        assert!(state.is_just_logged_in);
        assert!(state.is_after_registration);
        assert_eq!(action, SessionAction::Authenticated { celebrate: true });

        let (state, _) = handle_event(state, SessionEvent::CelebrationOver);
        assert!(state.is_authenticated);
        assert!(!state.is_just_logged_in);
        assert!(!state.is_after_registration);
    }

    #[test]
    fn revalidation_keeps_celebration_flags() {
        let celebrating = SessionState {
            is_just_logged_in: true,
            ..SessionState::signed_in(user())
        };
        let (state, _) = handle_event(celebrating, SessionEvent::Verified(true));
        assert!(state.is_just_logged_in);
    }

    #[test]
    fn login_required_resets_everything() {
        let (state, action) =
            handle_event(SessionState::signed_in(user()), SessionEvent::LoginRequired);
        assert_eq!(state, SessionState::signed_out());
        assert_eq!(action, SessionAction::Stop);
    }

    // --- driver against a mock server ---

    async fn start_server(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn timers(revalidate_ms: u64, celebrate_ms: u64) -> SessionTimers {
        SessionTimers {
            revalidate_every: Duration::from_millis(revalidate_ms),
            celebrate_for: Duration::from_millis(celebrate_ms),
        }
    }

    async fn context(base: &str, signed_in: bool, timers: SessionTimers) -> Arc<SessionContext> {
        let store = Arc::new(CredentialStore::in_memory());
        if signed_in {
            store
                .store_session(&Credentials::new("at_1", "rt_1"), Some(&user()))
                .await
                .unwrap();
        }
        SessionContext::new(ApiClient::new(reqwest::Client::new(), base, store), timers)
    }

    fn verify_route(valid: bool) -> axum::Router {
        axum::Router::new().route(
            "/auth/verify-token",
            post(move || async move {
                Json(json!({"success": true, "message": "", "data": {"valid": valid}}))
            }),
        )
    }

    fn refresh_rejected() -> axum::routing::MethodRouter {
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "message": "Refresh token expired"})),
            )
        })
    }

    #[tokio::test]
    async fn start_with_empty_store_is_signed_out() {
        let ctx = context("http://127.0.0.1:1", false, timers(60_000, 3_000)).await;
        ctx.start().await;
        let state = ctx.state();
        assert!(!state.is_loading);
        assert!(!state.is_authenticated);
    }

    #[tokio::test]
    async fn start_with_live_token_authenticates() {
        let base = start_server(verify_route(true)).await;
        let ctx = context(&base, true, timers(60_000, 3_000)).await;
        ctx.start().await;
        let state = ctx.state();
        assert!(state.is_authenticated);
        assert!(!state.is_just_logged_in);
        assert_eq!(state.user.unwrap().username, "a");
    }

    #[tokio::test]
    async fn start_with_dead_tokens_tears_down() {
        let app = verify_route(false).route("/auth/refresh", refresh_rejected());
        let base = start_server(app).await;
        let ctx = context(&base, true, timers(60_000, 3_000)).await;
        ctx.start().await;
        assert!(!ctx.state().is_authenticated);
        assert!(ctx.client().store().is_empty().await);
    }

    #[tokio::test]
    async fn start_with_dead_access_token_refreshes() {
        let app = verify_route(false).route(
            "/auth/refresh",
            post(|| async {
                Json(json!({
                    "success": true,
                    "message": "",
                    "data": {"accessToken": "at_2", "refreshToken": "rt_2"}
                }))
            }),
        );
        let base = start_server(app).await;
        let ctx = context(&base, true, timers(60_000, 3_000)).await;
        ctx.start().await;
        assert!(ctx.state().is_authenticated);
        let creds = ctx.client().store().credentials().await.unwrap();
        assert_eq!(creds.access_token.expose(), "at_2");
    }

    #[tokio::test]
    async fn login_stores_session_and_celebrates_briefly() {
        let app = axum::Router::new().route(
            "/auth/login",
            post(|| async {
                Json(json!({
                    "success": true,
                    "message": "Login successful",
                    "data": {
                        "accessToken": "at_login",
                        "refreshToken": "rt_login",
                        "user": {"id": 5, "username": "a", "email": "a@booknet.io", "role": "USER"}
                    }
                }))
            }),
        );
        let base = start_server(app).await;
        let ctx = context(&base, false, timers(60_000, 50)).await;
        ctx.start().await;

        ctx.login(&LoginForm::new("a", "b")).await.unwrap();
        let state = ctx.state();
        assert!(state.is_authenticated);
        assert!(state.is_just_logged_in);
        assert!(!state.is_after_registration);

        let store = ctx.client().store();
        assert!(store.has_session().await);

        let mut rx = ctx.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.is_just_logged_in))
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.state().is_authenticated);
    }

    #[tokio::test]
    async fn revalidation_tears_down_once_server_rejects() {
        let verifies = Arc::new(AtomicUsize::new(0));
        let verifies_clone = verifies.clone();
        let app = axum::Router::new()
            .route(
                "/auth/verify-token",
                post(move || {
                    let verifies = verifies_clone.clone();
                    async move {
                        // Valid at startup, dead on the first revalidation.
                        let valid = verifies.fetch_add(1, Ordering::SeqCst) == 0;
                        Json(json!({"success": true, "message": "", "data": {"valid": valid}}))
                    }
                }),
            )
            .route("/auth/refresh", refresh_rejected());
        let base = start_server(app).await;
        let ctx = context(&base, true, timers(50, 3_000)).await;
        ctx.start().await;
        assert!(ctx.state().is_authenticated);

        let mut rx = ctx.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.is_authenticated))
            .await
            .unwrap()
            .unwrap();
        assert!(ctx.client().store().is_empty().await);
        assert!(verifies.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn client_teardown_signal_resets_state() {
        let app = verify_route(true)
            .route(
                "/books/1",
                get(|| async { (StatusCode::UNAUTHORIZED, "expired") }),
            )
            .route("/auth/refresh", refresh_rejected());
        let base = start_server(app).await;
        let ctx = context(&base, true, timers(60_000, 3_000)).await;
        ctx.start().await;
        assert!(ctx.state().is_authenticated);

        let result = booknet_api::books::get_book(ctx.client(), 1).await;
        assert!(matches!(result, Err(booknet_api::Error::SessionExpired)));

        let mut rx = ctx.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| !s.is_authenticated))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn logout_clears_store_and_state() {
        let app = verify_route(true).route(
            "/auth/logout",
            post(|| async { Json(json!({"success": true, "message": "bye"})) }),
        );
        let base = start_server(app).await;
        let ctx = context(&base, true, timers(60_000, 3_000)).await;
        ctx.start().await;

        ctx.logout().await.unwrap();
        assert_eq!(ctx.state(), SessionState::signed_out());
        assert!(ctx.client().store().is_empty().await);
    }
}
