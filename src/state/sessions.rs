// SPDX-License-Identifier: MPL-2.0

//! Reading-session store: the single in-flight session plus read-through
//! history and statistics caches.

use crate::api::{
    ApiError, CalendarMonth, DailyStat, EndSessionRequest, MonthlyStat, OverallStats, Pagination,
    ReadingLeaderboardEntry, ReadingSession, SessionApi, SessionFilters, StartSessionRequest,
    WeeklyStat,
};
use crate::state::scope::RequestScope;
use crate::state::note_error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Window of the daily stats refreshed after a session ends
pub const DEFAULT_DAILY_DAYS: u32 = 7;

/// The session being read right now, with locally accumulated pause telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub session: ReadingSession,
    pub pause_count: u32,
    pub pause_total: Duration,
}

impl ActiveSession {
    fn new(session: ReadingSession) -> Self {
        Self {
            session,
            pause_count: 0,
            pause_total: Duration::ZERO,
        }
    }

    fn record_pause(&mut self, duration: Duration) {
        self.pause_count = self.pause_count.saturating_add(1);
        self.pause_total = self.pause_total.saturating_add(duration);
    }

    /// Mean pause length in seconds, zero when there were no pauses
    pub fn average_pause_secs(&self) -> f64 {
        if self.pause_count == 0 {
            0.0
        } else {
            self.pause_total.as_secs_f64() / f64::from(self.pause_count)
        }
    }

    fn end_request(&self, end_page: u32) -> EndSessionRequest {
        EndSessionRequest {
            end_page,
            pause_count: self.pause_count,
            total_pause_duration: self.pause_total.as_secs_f64(),
            average_pause_duration: self.average_pause_secs(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub active: Option<ActiveSession>,
    /// A start call is in flight
    pub starting: bool,
    /// An end call is in flight
    pub ending: bool,
    pub history: Vec<ReadingSession>,
    /// Filters of the last successful list fetch
    pub filters: SessionFilters,
    pub pagination: Pagination,
    pub loading: bool,
    pub loading_more: bool,
    pub overall: Option<OverallStats>,
    pub daily: Vec<DailyStat>,
    pub weekly: Vec<WeeklyStat>,
    pub monthly: Vec<MonthlyStat>,
    pub calendar: Option<CalendarMonth>,
    pub leaderboard: Vec<ReadingLeaderboardEntry>,
    /// Last failure message, shared by every action
    pub error: Option<String>,
}

impl SessionState {
    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    api: Arc<dyn SessionApi>,
    state: Arc<watch::Sender<SessionState>>,
    scope: Arc<RequestScope>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn SessionApi>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            api,
            state: Arc::new(state),
            scope: Arc::new(RequestScope::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Abort every in-flight request of this store.
    pub fn cancel_pending(&self) {
        self.scope.cancel();
    }

    /// Forget the active session and every cached page and statistic.
    pub fn reset(&self) {
        self.state.send_replace(SessionState::default());
    }

    fn fail(&self, error: ApiError) -> ApiError {
        self.state.send_modify(|s| note_error(&mut s.error, &error));
        error
    }

    pub async fn start_session(
        &self,
        book_id: &str,
        bookshelf_item_id: &str,
        start_page: u32,
    ) -> Result<ReadingSession, ApiError> {
        let admitted = self.state.send_if_modified(|s| {
            if s.active.is_some() || s.starting {
                return false;
            }
            s.starting = true;
            s.error = None;
            true
        });
        if !admitted {
            return Err(self.fail(ApiError::Validation(
                "A reading session is already in progress".to_string(),
            )));
        }

        let request = StartSessionRequest {
            book_id: book_id.to_string(),
            bookshelf_item_id: bookshelf_item_id.to_string(),
            start_page,
        };

        match self.scope.run(self.api.start_session(&request)).await {
            Ok(session) => {
                tracing::info!(session_id = %session.id, book_id, start_page, "reading session started");
                let active = ActiveSession::new(session.clone());
                self.state.send_modify(|s| {
                    s.starting = false;
                    s.active = Some(active);
                });
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, book_id, "failed to start reading session");
                self.state.send_modify(|s| {
                    s.starting = false;
                    note_error(&mut s.error, &e);
                });
                Err(e)
            }
        }
    }

    /// Count a pause against the active session. Returns false when no session is active.
    pub fn record_pause(&self, duration: Duration) -> bool {
        self.state.send_if_modified(|s| match s.active.as_mut() {
            Some(active) => {
                active.record_pause(duration);
                true
            }
            None => false,
        })
    }

    pub async fn end_session(&self, end_page: u32) -> Result<ReadingSession, ApiError> {
        let mut prepared = None;
        let mut busy = false;
        self.state.send_if_modified(|s| match &s.active {
            Some(_) if s.ending => {
                busy = true;
                false
            }
            Some(active) => {
                prepared = Some((active.session.id.clone(), active.end_request(end_page)));
                s.ending = true;
                s.error = None;
                true
            }
            None => false,
        });

        let Some((session_id, request)) = prepared else {
            let message = if busy {
                "The reading session is already being saved"
            } else {
                "No active reading session"
            };
            return Err(self.fail(ApiError::Validation(message.to_string())));
        };

        match self
            .scope
            .run(self.api.end_session(&session_id, &request))
            .await
        {
            Ok(record) => {
                tracing::info!(
                    session_id = %record.id,
                    pause_count = request.pause_count,
                    ink_drops = record.ink_drops_earned.unwrap_or(0),
                    "reading session finished"
                );
                let finished = record.clone();
                self.state.send_modify(|s| {
                    s.ending = false;
                    s.active = None;
                    s.history.insert(0, finished);
                });
                self.refresh_after_session();
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, session_id = %session_id, "failed to end reading session");
                self.state.send_modify(|s| {
                    s.ending = false;
                    note_error(&mut s.error, &e);
                });
                Err(e)
            }
        }
    }

    /// Refresh the aggregates a finished session changes. Not awaited by the caller.
    fn refresh_after_session(&self) {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::join!(
                store.fetch_overall_stats(),
                store.fetch_daily_stats(DEFAULT_DAILY_DAYS)
            );
        });
    }

    /// Fetch a page of history. `append = false` replaces the list from offset 0.
    pub async fn fetch_sessions(
        &self,
        mut filters: SessionFilters,
        append: bool,
    ) -> Result<(), ApiError> {
        if !append {
            filters.offset = 0;
        }
        self.state.send_modify(|s| {
            if append {
                s.loading_more = true;
            } else {
                s.loading = true;
            }
            s.error = None;
        });
        self.run_fetch(filters, append).await
    }

    /// Fetch the next page. Returns `Ok(false)` without touching anything when
    /// there is nothing more or a load is already running.
    pub async fn load_more(&self) -> Result<bool, ApiError> {
        let mut next = None;
        self.state.send_if_modified(|s| {
            if !s.pagination.has_more || s.loading || s.loading_more {
                return false;
            }
            let page_size = s
                .filters
                .limit
                .filter(|l| *l > 0)
                .unwrap_or(s.pagination.limit);
            if page_size == 0 {
                return false;
            }
            let mut filters = s.filters.clone();
            filters.offset = s.pagination.offset.saturating_add(page_size);
            next = Some(filters);
            s.loading_more = true;
            s.error = None;
            true
        });

        let Some(filters) = next else {
            return Ok(false);
        };
        self.run_fetch(filters, true).await.map(|_| true)
    }

    async fn run_fetch(&self, filters: SessionFilters, append: bool) -> Result<(), ApiError> {
        let result = self.scope.run(self.api.list_sessions(&filters)).await;
        match result {
            Ok(page) => {
                tracing::debug!(
                    offset = filters.offset,
                    count = page.sessions.len(),
                    has_more = page.pagination.has_more,
                    "fetched reading sessions"
                );
                self.state.send_modify(move |s| {
                    if append {
                        s.loading_more = false;
                        s.history.extend(page.sessions);
                    } else {
                        s.loading = false;
                        s.history = page.sessions;
                    }
                    s.pagination = page.pagination;
                    s.filters = filters;
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch reading sessions");
                self.state.send_modify(|s| {
                    if append {
                        s.loading_more = false;
                    } else {
                        s.loading = false;
                    }
                    note_error(&mut s.error, &e);
                });
                Err(e)
            }
        }
    }

    /// Read-through cache fill shared by the statistics fetchers. Failures are logged only.
    async fn load<T, F>(&self, what: &str, fut: F, apply: impl FnOnce(&mut SessionState, T))
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match self.scope.run(fut).await {
            Ok(value) => self.state.send_modify(|s| apply(s, value)),
            Err(ApiError::Cancelled) => {}
            Err(e) => tracing::warn!(error = %e, "failed to fetch {what}"),
        }
    }

    pub async fn fetch_overall_stats(&self) {
        self.load("overall stats", self.api.overall_stats(), |s, stats| {
            s.overall = Some(stats);
        })
        .await;
    }

    pub async fn fetch_daily_stats(&self, days: u32) {
        self.load("daily stats", self.api.daily_stats(days), |s, daily| {
            s.daily = daily;
        })
        .await;
    }

    pub async fn fetch_weekly_stats(&self, weeks: u32) {
        self.load("weekly stats", self.api.weekly_stats(weeks), |s, weekly| {
            s.weekly = weekly;
        })
        .await;
    }

    pub async fn fetch_monthly_stats(&self, months: u32) {
        self.load("monthly stats", self.api.monthly_stats(months), |s, monthly| {
            s.monthly = monthly;
        })
        .await;
    }

    pub async fn fetch_calendar(&self, year: i32, month: u32) {
        self.load("reading calendar", self.api.calendar(year, month), |s, calendar| {
            s.calendar = Some(calendar);
        })
        .await;
    }

    pub async fn fetch_leaderboard(&self, limit: u32) {
        self.load("reading leaderboard", self.api.leaderboard(limit), |s, entries| {
            s.leaderboard = entries;
        })
        .await;
    }
}
