// SPDX-License-Identifier: MPL-2.0

//! Scripted in-memory backend for store tests.

use crate::api::client::ApiError;
use crate::api::services::{ApiResult, AuthApi, SessionApi, StreakApi};
use crate::api::types::{
    AuthResponse, CalendarMonth, CheckInResponse, DailyChallenge, DailyStat, EndSessionRequest,
    LeaderboardPeriod, LoginRequest, MonthlyStat, OverallStats, ReadingLeaderboardEntry,
    ReadingSession, RegisterRequest, RestoreResponse, SessionFilters, SessionPage,
    StartSessionRequest, Streak, StreakLeaderboardEntry, User, WeeklyStat,
};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Replies are queued per operation; the last one stays scripted for repeat calls.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<HashMap<&'static str, VecDeque<Result<Value, ApiError>>>>,
    calls: Mutex<Vec<(&'static str, Value)>>,
    gates: Mutex<HashMap<&'static str, oneshot::Receiver<()>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, op: &'static str, value: Value) {
        self.push(op, Ok(value));
    }

    pub fn fail(&self, op: &'static str, error: ApiError) {
        self.push(op, Err(error));
    }

    fn push(&self, op: &'static str, reply: Result<Value, ApiError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(reply);
    }

    /// Hold the next call to `op` until the returned sender fires (or drops).
    pub fn gate(&self, op: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(op, rx);
        tx
    }

    pub fn calls(&self, op: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == op)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls(op).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn handle<T: DeserializeOwned>(&self, op: &'static str, body: Value) -> ApiResult<T> {
        self.calls.lock().unwrap().push((op, body));

        let gate = self.gates.lock().unwrap().remove(op);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies.entry(op).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match reply {
            Some(Ok(value)) => serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(e.to_string())),
            Some(Err(e)) => Err(e),
            None => Err(ApiError::Network(format!("no reply scripted for {op}"))),
        }
    }
}

/// Unwrap `{ "<key>": ... }` the way the HTTP client unwraps its envelopes.
fn field<T: DeserializeOwned>(mut envelope: Value, key: &str) -> ApiResult<T> {
    let inner = envelope.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    serde_json::from_value(inner)
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

fn body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "username": format!("reader-{id}"),
        "email": format!("{id}@example.com"),
        "inkDrops": 120
    })
}

pub fn session_json(id: &str, book_id: &str, start_page: u32) -> Value {
    json!({
        "id": id,
        "bookId": book_id,
        "bookshelfItemId": "s1",
        "startTime": "2026-10-19T08:00:00Z",
        "startPage": start_page
    })
}

pub fn finished_session_json(id: &str, start_page: u32, end_page: u32) -> Value {
    json!({
        "id": id,
        "bookId": "b1",
        "bookshelfItemId": "s1",
        "startTime": "2026-10-19T08:00:00Z",
        "endTime": "2026-10-19T08:45:00Z",
        "startPage": start_page,
        "endPage": end_page,
        "duration": 2700,
        "pagesRead": end_page - start_page,
        "readingSpeed": 40.0,
        "focusScore": 0.92,
        "inkDropsEarned": 15
    })
}

pub fn page_json(ids: std::ops::Range<u32>, offset: u32, limit: u32, total: u32) -> Value {
    let sessions: Vec<Value> = ids
        .map(|i| finished_session_json(&format!("sess-{i}"), 0, 10))
        .collect();
    json!({
        "sessions": sessions,
        "pagination": {
            "total": total,
            "limit": limit,
            "offset": offset,
            "hasMore": offset + limit < total
        }
    })
}

pub fn streak_json(current: u32) -> Value {
    json!({
        "streak": {
            "currentStreak": current,
            "longestStreak": current.max(10),
            "lastCheckIn": "2026-10-18T07:00:00Z",
            "totalCheckIns": current + 20,
            "canRestore": false,
            "milestones": { "day7": { "achieved": current >= 7 } }
        }
    })
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
        self.handle("login", body(request)).await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        self.handle("register", body(request)).await
    }

    async fn me(&self) -> ApiResult<User> {
        let envelope: Value = self.handle("me", Value::Null).await?;
        field(envelope, "user")
    }
}

#[async_trait]
impl SessionApi for FakeBackend {
    async fn start_session(&self, request: &StartSessionRequest) -> ApiResult<ReadingSession> {
        self.handle("start_session", body(request)).await
    }

    async fn end_session(
        &self,
        session_id: &str,
        request: &EndSessionRequest,
    ) -> ApiResult<ReadingSession> {
        let mut payload = body(request);
        payload["sessionId"] = json!(session_id);
        self.handle("end_session", payload).await
    }

    async fn list_sessions(&self, filters: &SessionFilters) -> ApiResult<SessionPage> {
        let query: serde_json::Map<String, Value> = filters
            .to_query()
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        self.handle("list_sessions", Value::Object(query)).await
    }

    async fn overall_stats(&self) -> ApiResult<OverallStats> {
        self.handle("overall_stats", Value::Null).await
    }

    async fn daily_stats(&self, days: u32) -> ApiResult<Vec<DailyStat>> {
        self.handle("daily_stats", json!({ "days": days })).await
    }

    async fn weekly_stats(&self, weeks: u32) -> ApiResult<Vec<WeeklyStat>> {
        self.handle("weekly_stats", json!({ "weeks": weeks })).await
    }

    async fn monthly_stats(&self, months: u32) -> ApiResult<Vec<MonthlyStat>> {
        self.handle("monthly_stats", json!({ "months": months }))
            .await
    }

    async fn calendar(&self, year: i32, month: u32) -> ApiResult<CalendarMonth> {
        self.handle("calendar", json!({ "year": year, "month": month }))
            .await
    }

    async fn leaderboard(&self, limit: u32) -> ApiResult<Vec<ReadingLeaderboardEntry>> {
        let envelope: Value = self
            .handle("reading_leaderboard", json!({ "limit": limit }))
            .await?;
        field(envelope, "leaderboard")
    }
}

#[async_trait]
impl StreakApi for FakeBackend {
    async fn streak(&self) -> ApiResult<Streak> {
        let envelope: Value = self.handle("streak", Value::Null).await?;
        field(envelope, "streak")
    }

    async fn check_in(&self) -> ApiResult<CheckInResponse> {
        self.handle("check_in", Value::Null).await
    }

    async fn restore(&self) -> ApiResult<RestoreResponse> {
        self.handle("restore", Value::Null).await
    }

    async fn today_challenge(&self) -> ApiResult<Option<DailyChallenge>> {
        self.handle("today_challenge", Value::Null).await
    }

    async fn leaderboard(
        &self,
        period: LeaderboardPeriod,
    ) -> ApiResult<Vec<StreakLeaderboardEntry>> {
        let envelope: Value = self
            .handle("streak_leaderboard", json!({ "period": period.as_str() }))
            .await?;
        field(envelope, "leaderboard")
    }
}
