// SPDX-License-Identifier: MPL-2.0

//! Streak store: daily check-in with optimistic increment and forced
//! reconciliation, plus challenge and leaderboard caches.

use crate::api::{
    ApiError, CheckInResponse, DailyChallenge, LeaderboardPeriod, RestoreResponse, Streak,
    StreakApi, StreakLeaderboardEntry,
};
use crate::state::note_error;
use crate::state::scope::RequestScope;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// What the client believes about the streak.
///
/// A check-in moves `Confirmed` to `Tentative`; the refetch that always
/// follows moves it back to `Confirmed` with whatever the server says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreakView {
    #[default]
    Unknown,
    Confirmed(Streak),
    Tentative {
        optimistic: Streak,
        /// Last server truth, restored if reconciliation fails
        previous: Option<Streak>,
    },
}

impl StreakView {
    /// The streak to render: the optimistic value while a check-in is in flight.
    pub fn current(&self) -> Option<&Streak> {
        match self {
            Self::Unknown => None,
            Self::Confirmed(streak) => Some(streak),
            Self::Tentative { optimistic, .. } => Some(optimistic),
        }
    }

    pub fn current_streak(&self) -> u32 {
        self.current().map(|s| s.current_streak).unwrap_or(0)
    }

    /// Last value the server reported
    pub fn confirmed(&self) -> Option<&Streak> {
        match self {
            Self::Unknown => None,
            Self::Confirmed(streak) => Some(streak),
            Self::Tentative { previous, .. } => previous.as_ref(),
        }
    }

    pub fn is_tentative(&self) -> bool {
        matches!(self, Self::Tentative { .. })
    }

    /// Apply the optimistic increment. False if a check-in is already tentative.
    pub fn begin_check_in(&mut self, now: DateTime<Utc>) -> bool {
        let previous = match self {
            Self::Tentative { .. } => return false,
            Self::Unknown => None,
            Self::Confirmed(streak) => Some(streak.clone()),
        };
        let optimistic = previous.clone().unwrap_or_default().optimistic_check_in(now);
        *self = Self::Tentative {
            optimistic,
            previous,
        };
        true
    }

    /// A plain fetch result. During a check-in it only refreshes the rollback
    /// value; the check-in's own refetch decides what is shown.
    pub fn observe(&mut self, streak: Streak) {
        match self {
            Self::Tentative { previous, .. } => *previous = Some(streak),
            _ => *self = Self::Confirmed(streak),
        }
    }

    /// Reconciliation succeeded: server truth replaces the optimistic value.
    pub fn confirm(&mut self, streak: Streak) {
        *self = Self::Confirmed(streak);
    }

    /// Reconciliation failed: drop the optimistic value.
    pub fn abandon(&mut self) {
        if let Self::Tentative { previous, .. } = self {
            *self = match previous.take() {
                Some(streak) => Self::Confirmed(streak),
                None => Self::Unknown,
            };
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreakState {
    pub view: StreakView,
    pub challenge: Option<DailyChallenge>,
    pub leaderboard: Vec<StreakLeaderboardEntry>,
    pub leaderboard_period: LeaderboardPeriod,
    pub loading: bool,
    pub restoring: bool,
    /// Transient failure message; the streak itself has no error state
    pub error: Option<String>,
}

impl StreakState {
    pub fn current_streak(&self) -> u32 {
        self.view.current_streak()
    }

    pub fn is_checking_in(&self) -> bool {
        self.view.is_tentative()
    }
}

/// Result of an accepted check-in
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInOutcome {
    pub ink_drops_earned: u32,
    /// Milestone threshold in days, when this check-in reached one
    pub milestone_achieved: Option<u32>,
    /// Server streak after reconciliation, if the refetch succeeded
    pub streak: Option<Streak>,
}

#[derive(Clone)]
pub struct StreakStore {
    api: Arc<dyn StreakApi>,
    state: Arc<watch::Sender<StreakState>>,
    scope: Arc<RequestScope>,
}

impl StreakStore {
    pub fn new(api: Arc<dyn StreakApi>) -> Self {
        let (state, _) = watch::channel(StreakState::default());
        Self {
            api,
            state: Arc::new(state),
            scope: Arc::new(RequestScope::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StreakState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StreakState {
        self.state.borrow().clone()
    }

    pub fn cancel_pending(&self) {
        self.scope.cancel();
    }

    pub fn reset(&self) {
        self.state.send_replace(StreakState::default());
    }

    pub async fn fetch_streak(&self) -> Result<Streak, ApiError> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.scope.run(self.api.streak()).await;
        self.state.send_modify(|s| {
            s.loading = false;
            match &result {
                Ok(streak) => s.view.observe(streak.clone()),
                Err(e) => note_error(&mut s.error, e),
            }
        });
        if let Err(e) = &result {
            tracing::warn!(error = %e, "failed to fetch streak");
        }
        result
    }

    /// Check in for today.
    ///
    /// The optimistic value is visible only while the call is in flight; the
    /// streak is refetched afterwards whether the check-in succeeded or not.
    pub async fn check_in(&self) -> Result<CheckInOutcome, ApiError> {
        let now = Utc::now();
        let began = self.state.send_if_modified(|s| {
            if !s.view.begin_check_in(now) {
                return false;
            }
            s.error = None;
            true
        });
        if !began {
            let error = ApiError::Validation("A check-in is already in progress".to_string());
            self.state.send_modify(|s| note_error(&mut s.error, &error));
            return Err(error);
        }

        // One token for the check-in and its refetch: once cancelled, neither goes out
        let token = self.scope.token();
        let result = RequestScope::run_under(&token, self.api.check_in())
            .await
            .and_then(accepted_check_in);
        if token.is_cancelled() {
            self.state.send_modify(|s| s.view.abandon());
            tracing::debug!("check-in cancelled");
            return Err(ApiError::Cancelled);
        }
        let refreshed = RequestScope::run_under(&token, self.api.streak()).await;

        self.state.send_modify(|s| {
            match &refreshed {
                Ok(streak) => s.view.confirm(streak.clone()),
                Err(e) => {
                    s.view.abandon();
                    note_error(&mut s.error, e);
                }
            }
            if let Err(e) = &result {
                note_error(&mut s.error, e);
            }
        });

        match &result {
            Ok(response) => tracing::info!(
                ink_drops = response.ink_drops_earned,
                milestone = ?response.milestone_achieved,
                streak = ?refreshed.as_ref().ok().map(|s| s.current_streak),
                "checked in"
            ),
            Err(e) => tracing::warn!(error = %e, "check-in failed"),
        }
        if let Err(e) = &refreshed {
            tracing::warn!(error = %e, "streak reconciliation failed after check-in");
        }

        let response = result?;
        Ok(CheckInOutcome {
            ink_drops_earned: response.ink_drops_earned,
            milestone_achieved: response.milestone_achieved,
            streak: refreshed.ok(),
        })
    }

    /// Restore a lapsed streak. No optimistic update; the streak is refetched either way.
    pub async fn restore_streak(&self) -> Result<RestoreResponse, ApiError> {
        self.state.send_modify(|s| {
            s.restoring = true;
            s.error = None;
        });

        let result = self
            .scope
            .run(self.api.restore())
            .await
            .and_then(|r| {
                if r.success {
                    Ok(r)
                } else {
                    Err(ApiError::Rejected(
                        r.message
                            .unwrap_or_else(|| "Streak could not be restored".to_string()),
                    ))
                }
            });

        self.state.send_modify(|s| {
            s.restoring = false;
            if let Err(e) = &result {
                note_error(&mut s.error, e);
            }
        });
        if let Err(e) = &result {
            tracing::warn!(error = %e, "streak restore failed");
        }

        // Failure here is already recorded in `error`
        let _ = self.fetch_streak().await;
        if let Err(e) = &result {
            self.state.send_modify(|s| note_error(&mut s.error, e));
        }
        result
    }

    pub async fn fetch_today_challenge(&self) -> Result<Option<DailyChallenge>, ApiError> {
        let result = self.scope.run(self.api.today_challenge()).await;
        self.state.send_modify(|s| match &result {
            Ok(challenge) => s.challenge = challenge.clone(),
            Err(e) => note_error(&mut s.error, e),
        });
        result
    }

    pub async fn fetch_leaderboard(
        &self,
        period: LeaderboardPeriod,
    ) -> Result<Vec<StreakLeaderboardEntry>, ApiError> {
        let result = self.scope.run(self.api.leaderboard(period)).await;
        self.state.send_modify(|s| match &result {
            Ok(entries) => {
                s.leaderboard = entries.clone();
                s.leaderboard_period = period;
            }
            Err(e) => note_error(&mut s.error, e),
        });
        result
    }
}

fn accepted_check_in(response: CheckInResponse) -> Result<CheckInResponse, ApiError> {
    if response.success {
        Ok(response)
    } else {
        Err(ApiError::Rejected(
            response
                .message
                .unwrap_or_else(|| "Check-in was not accepted".to_string()),
        ))
    }
}
