// SPDX-License-Identifier: MPL-2.0

//! Application state: the HTTP client, device storage and every store, plus
//! the screen-level actions that report outcomes through toasts and alerts.

use crate::api::{
    ApiError, AuthApi, InkdropClient, ReadingSession, RestoreResponse, SessionApi, StreakApi,
    TokenCell, User,
};
use crate::config::{Config, ConfigError};
use crate::state::{
    Alert, AlertStore, AuthStore, ChatPreferences, CheckInOutcome, SessionStore, StreakStore,
    ToastStore,
};
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not signed in")]
    NotSignedIn,
}

pub struct App {
    config: Config,
    storage: Storage,
    token: TokenCell,
    pub auth: AuthStore,
    pub sessions: SessionStore,
    pub streak: StreakStore,
    pub toasts: ToastStore,
    pub alerts: AlertStore,
}

impl App {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let storage = Storage::open(&config.storage_path())?;
        let token = TokenCell::new();
        let client = Arc::new(InkdropClient::new(&config, token.clone())?);
        tracing::debug!(api_url = %client.base_url(), "client ready");

        Ok(Self::with_backends(
            config,
            storage,
            token,
            client.clone(),
            client.clone(),
            client,
        ))
    }

    pub fn with_backends(
        config: Config,
        storage: Storage,
        token: TokenCell,
        auth: Arc<dyn AuthApi>,
        sessions: Arc<dyn SessionApi>,
        streak: Arc<dyn StreakApi>,
    ) -> Self {
        Self {
            auth: AuthStore::new(auth, token.clone(), storage.clone()),
            sessions: SessionStore::new(sessions),
            streak: StreakStore::new(streak),
            toasts: ToastStore::new(),
            alerts: AlertStore::new(),
            config,
            storage,
            token,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_set() && self.auth.is_authenticated()
    }

    /// Route a failed action: validation problems are a toast, the rest need acknowledging.
    fn report(&self, title: &str, error: &ApiError) {
        match error {
            ApiError::Cancelled => {}
            ApiError::Validation(message) => {
                self.toasts.error(message.clone());
            }
            other => self.alerts.show(Alert::new(title, other.to_string())),
        }
    }

    /// Cold start: rehydrate stored credentials and prime the streak.
    pub async fn restore_session(&self) -> bool {
        let signed_in = self.auth.check_auth().await;
        if signed_in {
            // Failure is recorded on the streak store
            let _ = self.streak.fetch_streak().await;
        }
        signed_in
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        match self.auth.login(email, password).await {
            Ok(user) => {
                self.toasts
                    .success(format!("Welcome back, {}", user.display_name()));
                Ok(user)
            }
            Err(e) => {
                self.report("Login failed", &e);
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<User, ApiError> {
        match self.auth.register(username, email, password).await {
            Ok(user) => {
                self.toasts
                    .success(format!("Welcome to Inkdrop, {}", user.display_name()));
                Ok(user)
            }
            Err(e) => {
                self.report("Registration failed", &e);
                Err(e)
            }
        }
    }

    /// Abort everything in flight, forget the user's cached data, then drop
    /// the credentials.
    pub fn sign_out(&self) {
        self.sessions.cancel_pending();
        self.streak.cancel_pending();
        self.sessions.reset();
        self.streak.reset();
        self.alerts.reset();
        self.toasts.reset();
        self.auth.logout();
        self.toasts.info("Signed out");
    }

    pub async fn check_in(&self) -> Result<CheckInOutcome, ApiError> {
        match self.streak.check_in().await {
            Ok(outcome) => {
                self.toasts.success(format!(
                    "Checked in! +{} ink drops",
                    outcome.ink_drops_earned
                ));
                if let Some(days) = outcome.milestone_achieved {
                    self.alerts.show(Alert::new(
                        "Milestone reached!",
                        format!("You reached a {days}-day reading streak"),
                    ));
                }
                Ok(outcome)
            }
            Err(e) => {
                self.report("Check-in failed", &e);
                Err(e)
            }
        }
    }

    pub async fn finish_session(&self, end_page: u32) -> Result<ReadingSession, ApiError> {
        match self.sessions.end_session(end_page).await {
            Ok(session) => {
                let pages = session.pages_read.unwrap_or(0);
                let drops = session.ink_drops_earned.unwrap_or(0);
                self.toasts.success(format!(
                    "Session saved: {pages} pages, +{drops} ink drops"
                ));
                Ok(session)
            }
            Err(e) => {
                self.report("Could not end session", &e);
                Err(e)
            }
        }
    }

    pub async fn restore_streak(&self) -> Result<RestoreResponse, ApiError> {
        match self.streak.restore_streak().await {
            Ok(response) => {
                self.toasts.success(format!(
                    "Streak restored for {} ink drops",
                    response.ink_drops_spent
                ));
                Ok(response)
            }
            Err(e) => {
                self.report("Could not restore streak", &e);
                Err(e)
            }
        }
    }

    pub fn chat_preferences(&self) -> ChatPreferences {
        ChatPreferences::load(&self.storage)
    }

    pub fn save_chat_preferences(&self, prefs: &ChatPreferences) -> Result<(), StorageError> {
        prefs.save(&self.storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeBackend, finished_session_json, session_json, streak_json, user_json};
    use crate::state::{ChatTheme, ToastKind};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use url::Url;

    fn app() -> (Arc<FakeBackend>, App) {
        let config = Config {
            api_url: Url::parse("https://api.example.com").unwrap(),
            request_timeout: Duration::from_secs(5),
            check_in_timeout: Duration::from_secs(30),
            data_dir: PathBuf::from("/tmp"),
            log_filter: "off".to_string(),
        };
        let backend = Arc::new(FakeBackend::new());
        let app = App::with_backends(
            config,
            Storage::in_memory().unwrap(),
            TokenCell::new(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
        );
        (backend, app)
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let (backend, app) = app();
        backend.reply("login", json!({ "token": "tok-1", "user": user_json("u1") }));

        app.sign_in("u1@example.com", "hunter22").await.unwrap();
        assert!(app.is_signed_in());
        assert_eq!(app.toasts.visible()[0].message, "Welcome back, reader-u1");

        app.sign_out();
        assert!(!app.is_signed_in());
        assert_eq!(app.toasts.visible().last().unwrap().message, "Signed out");
    }

    #[tokio::test]
    async fn test_sign_out_forgets_previous_user() {
        let (backend, app) = app();
        backend.reply("login", json!({ "token": "tok-1", "user": user_json("u1") }));
        backend.reply("streak", streak_json(42));
        backend.reply("start_session", session_json("sess-1", "b1", 10));
        backend.reply("check_in", json!({ "success": true, "inkDropsEarned": 10 }));

        app.sign_in("u1@example.com", "hunter22").await.unwrap();
        app.streak.fetch_streak().await.unwrap();
        app.sessions.start_session("b1", "s1", 10).await.unwrap();
        app.alerts.show(Alert::new("Milestone reached!", "42"));

        let _release = backend.gate("check_in");
        let streak = app.streak.clone();
        let pending = tokio::spawn(async move { streak.check_in().await });
        while backend.call_count("check_in") == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        app.sign_out();
        assert_eq!(pending.await.unwrap(), Err(ApiError::Cancelled));

        assert!(!app.is_signed_in());
        assert_eq!(app.streak.snapshot().view, crate::state::StreakView::Unknown);
        let sessions = app.sessions.snapshot();
        assert!(sessions.active.is_none());
        assert!(sessions.history.is_empty());
        assert!(app.alerts.current().is_none());
        assert_eq!(app.toasts.visible().len(), 1);

        // The cancelled check-in never refetched the streak
        assert_eq!(backend.call_count("streak"), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_is_a_toast() {
        let (backend, app) = app();
        assert!(app.sign_up("ab", "ab@example.com", "longenough").await.is_err());
        assert_eq!(backend.total_calls(), 0);
        assert!(app.alerts.current().is_none());
        assert_eq!(app.toasts.visible()[0].kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn test_server_failure_is_an_alert() {
        let (backend, app) = app();
        backend.fail("login", ApiError::Unauthorized("Invalid credentials".to_string()));

        assert!(app.sign_in("u1@example.com", "wrong-pass").await.is_err());
        let alert = app.alerts.current().unwrap();
        assert_eq!(alert.title, "Login failed");
        assert_eq!(alert.message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_check_in_reports_drops_and_milestone() {
        let (backend, app) = app();
        backend.reply(
            "check_in",
            json!({ "success": true, "inkDropsEarned": 10, "milestoneAchieved": 7 }),
        );
        backend.reply("streak", streak_json(7));

        let outcome = app.check_in().await.unwrap();
        assert_eq!(outcome.milestone_achieved, Some(7));
        assert_eq!(app.streak.snapshot().current_streak(), 7);
        assert_eq!(app.toasts.visible()[0].message, "Checked in! +10 ink drops");
        assert_eq!(
            app.alerts.current().unwrap().message,
            "You reached a 7-day reading streak"
        );
    }

    #[tokio::test]
    async fn test_check_in_failure_raises_alert() {
        let (backend, app) = app();
        backend.fail("check_in", ApiError::Timeout);
        backend.reply("streak", streak_json(4));

        assert!(app.check_in().await.is_err());
        assert_eq!(app.streak.snapshot().current_streak(), 4);
        assert_eq!(app.alerts.current().unwrap().title, "Check-in failed");
        assert!(app.toasts.visible().is_empty());
    }

    #[tokio::test]
    async fn test_finish_session_without_active_session() {
        let (backend, app) = app();
        assert!(app.finish_session(40).await.is_err());
        assert_eq!(backend.total_calls(), 0);
        assert_eq!(app.toasts.visible()[0].message, "No active reading session");
    }

    #[tokio::test]
    async fn test_finish_session_summarizes() {
        let (backend, app) = app();
        backend.reply("start_session", session_json("sess-1", "b1", 10));
        backend.reply("end_session", finished_session_json("sess-1", 10, 40));
        backend.reply("overall_stats", json!({}));
        backend.reply("daily_stats", json!([]));

        app.sessions.start_session("b1", "s1", 10).await.unwrap();
        let session = app.finish_session(40).await.unwrap();
        assert_eq!(session.pages_read, Some(30));
        assert_eq!(
            app.toasts.visible()[0].message,
            "Session saved: 30 pages, +15 ink drops"
        );
    }

    #[tokio::test]
    async fn test_restore_session_primes_streak() {
        let (backend, app) = app();
        app.storage
            .set(crate::storage::keys::AUTH_TOKEN, "tok-1")
            .unwrap();
        backend.reply("me", json!({ "user": user_json("u1") }));
        backend.reply("streak", streak_json(3));

        assert!(app.restore_session().await);
        assert!(app.is_signed_in());
        assert_eq!(app.streak.snapshot().current_streak(), 3);
    }

    #[test]
    fn test_chat_preferences_persist() {
        let (_, app) = app();
        let mut prefs = app.chat_preferences();
        assert_eq!(prefs.theme, ChatTheme::Light);

        prefs.theme = ChatTheme::Midnight;
        app.save_chat_preferences(&prefs).unwrap();
        assert_eq!(app.chat_preferences().theme, ChatTheme::Midnight);
    }
}
