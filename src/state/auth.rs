// SPDX-License-Identifier: MPL-2.0

//! Auth store: owns the bearer token and user profile and keeps both in
//! device storage.

use crate::api::{ApiError, AuthApi, AuthResponse, LoginRequest, RegisterRequest, TokenCell, User};
use crate::state::note_error;
use crate::state::scope::RequestScope;
use crate::storage::{Storage, keys};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::watch;
use unicode_segmentation::UnicodeSegmentation;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// Cold-start rehydration has run
    pub initialized: bool,
    pub loading: bool,
    pub error: Option<String>,
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Please enter your email and password".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Please fill in all fields".to_string()));
    }

    let username_len = username.trim().graphemes(true).count();
    if !USERNAME_LEN.contains(&username_len) {
        return Err(ApiError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }

    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ApiError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(())
}

#[derive(Clone)]
pub struct AuthStore {
    api: Arc<dyn AuthApi>,
    token: TokenCell,
    storage: Storage,
    state: Arc<watch::Sender<AuthState>>,
    scope: Arc<RequestScope>,
}

impl AuthStore {
    pub fn new(api: Arc<dyn AuthApi>, token: TokenCell, storage: Storage) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            api,
            token,
            storage,
            state: Arc::new(state),
            scope: Arc::new(RequestScope::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    fn reject(&self, error: ApiError) -> ApiError {
        self.state.send_modify(|s| note_error(&mut s.error, &error));
        error
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        validate_login(email, password).map_err(|e| self.reject(e))?;

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.begin();
        let result = self.scope.run(self.api.login(&request)).await;
        self.finish_auth(result, "login")
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        validate_registration(username, email, password).map_err(|e| self.reject(e))?;

        let request = RegisterRequest {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.begin();
        let result = self.scope.run(self.api.register(&request)).await;
        self.finish_auth(result, "register")
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish_auth(
        &self,
        result: Result<AuthResponse, ApiError>,
        action: &str,
    ) -> Result<User, ApiError> {
        match result {
            Ok(AuthResponse { token, user }) => {
                self.persist(&token, &user);
                self.token.set(Some(token));
                tracing::info!(user_id = %user.id, "{action} succeeded");
                let signed_in = user.clone();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.user = Some(signed_in);
                    s.is_authenticated = true;
                    s.initialized = true;
                });
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "{action} failed");
                self.state.send_modify(|s| {
                    s.loading = false;
                    note_error(&mut s.error, &e);
                });
                Err(e)
            }
        }
    }

    /// A failed write only costs the next cold start a re-login.
    fn persist(&self, token: &str, user: &User) {
        if let Err(e) = self
            .storage
            .set(keys::AUTH_TOKEN, token)
            .and_then(|_| self.storage.set(keys::AUTH_USER, user))
        {
            tracing::error!(error = %e, "failed to persist credentials");
        }
    }

    pub fn logout(&self) {
        self.scope.cancel();
        self.token.set(None);
        if let Err(e) = self.storage.remove_all(&[keys::AUTH_TOKEN, keys::AUTH_USER]) {
            tracing::error!(error = %e, "failed to clear stored credentials");
        }
        self.state.send_modify(|s| {
            *s = AuthState {
                initialized: true,
                ..AuthState::default()
            };
        });
        tracing::info!("logged out");
    }

    /// Cold-start rehydration. Returns whether the app is signed in afterwards.
    ///
    /// A 401 clears the stored credentials; any other failure keeps the
    /// cached profile so the app can start offline.
    pub async fn check_auth(&self) -> bool {
        let token = match self.storage.get::<String>(keys::AUTH_TOKEN) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "stored token unreadable");
                None
            }
        };

        let Some(token) = token else {
            self.state.send_modify(|s| {
                s.initialized = true;
                s.is_authenticated = false;
                s.user = None;
            });
            return false;
        };

        let cached_user = self.storage.get::<User>(keys::AUTH_USER).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored user unreadable");
            None
        });

        self.token.set(Some(token));
        self.state.send_modify(|s| {
            s.user = cached_user;
            s.is_authenticated = true;
            s.loading = true;
            s.error = None;
        });

        match self.scope.run(self.api.me()).await {
            Ok(user) => {
                if let Err(e) = self.storage.set(keys::AUTH_USER, &user) {
                    tracing::error!(error = %e, "failed to persist user profile");
                }
                self.state.send_modify(|s| {
                    s.user = Some(user);
                    s.loading = false;
                    s.initialized = true;
                });
                true
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("stored token rejected, signing out");
                self.logout();
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not verify stored session, using cached profile");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.initialized = true;
                    note_error(&mut s.error, &e);
                });
                true
            }
        }
    }
}
