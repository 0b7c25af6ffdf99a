// SPDX-License-Identifier: MPL-2.0

pub mod auth;
pub mod notify;
mod scope;
pub mod sessions;
pub mod settings;
pub mod streak;

pub use auth::{AuthState, AuthStore};
pub use notify::{Alert, AlertStore, Toast, ToastKind, ToastStore};
pub use scope::RequestScope;
pub use sessions::{ActiveSession, SessionState, SessionStore};
pub use settings::{ChatPreferences, ChatTheme, FontSize};
pub use streak::{CheckInOutcome, StreakState, StreakStore, StreakView};

use crate::api::ApiError;

/// Record a failed action's message. Cancelled requests leave no trace.
pub(crate) fn note_error(slot: &mut Option<String>, error: &ApiError) {
    if !matches!(error, ApiError::Cancelled) {
        *slot = Some(error.to_string());
    }
}
