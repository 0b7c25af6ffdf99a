// SPDX-License-Identifier: MPL-2.0

//! Backend contracts the stores depend on.
//!
//! Stores only see these traits, so they can run against the real HTTP client
//! or an in-memory backend in tests.

use crate::api::client::{ApiError, InkdropClient, RequestOptions};
use crate::api::types::{
    AuthResponse, CalendarMonth, ChallengeEnvelope, CheckInResponse, DailyChallenge, DailyStat,
    EndSessionRequest, LeaderboardEnvelope, LeaderboardPeriod, LoginRequest, MonthlyStat,
    OverallStats, ReadingLeaderboardEntry, ReadingSession, RegisterRequest, RestoreResponse,
    SessionEnvelope, SessionFilters, SessionPage, StartSessionRequest, Streak, StreakEnvelope,
    StreakLeaderboardEntry, User, UserEnvelope, WeeklyStat,
};
use async_trait::async_trait;
use reqwest::Method;

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse>;
    /// Profile of the user the current token belongs to
    async fn me(&self) -> ApiResult<User>;
}

#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn start_session(&self, request: &StartSessionRequest) -> ApiResult<ReadingSession>;
    async fn end_session(
        &self,
        session_id: &str,
        request: &EndSessionRequest,
    ) -> ApiResult<ReadingSession>;
    async fn list_sessions(&self, filters: &SessionFilters) -> ApiResult<SessionPage>;
    async fn overall_stats(&self) -> ApiResult<OverallStats>;
    async fn daily_stats(&self, days: u32) -> ApiResult<Vec<DailyStat>>;
    async fn weekly_stats(&self, weeks: u32) -> ApiResult<Vec<WeeklyStat>>;
    async fn monthly_stats(&self, months: u32) -> ApiResult<Vec<MonthlyStat>>;
    async fn calendar(&self, year: i32, month: u32) -> ApiResult<CalendarMonth>;
    async fn leaderboard(&self, limit: u32) -> ApiResult<Vec<ReadingLeaderboardEntry>>;
}

#[async_trait]
pub trait StreakApi: Send + Sync {
    async fn streak(&self) -> ApiResult<Streak>;
    async fn check_in(&self) -> ApiResult<CheckInResponse>;
    async fn restore(&self) -> ApiResult<RestoreResponse>;
    async fn today_challenge(&self) -> ApiResult<Option<DailyChallenge>>;
    async fn leaderboard(&self, period: LeaderboardPeriod)
    -> ApiResult<Vec<StreakLeaderboardEntry>>;
}

#[async_trait]
impl AuthApi for InkdropClient {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
        self.post("/api/auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        self.post("/api/auth/register", request).await
    }

    async fn me(&self) -> ApiResult<User> {
        let envelope: UserEnvelope = self.get("/api/auth/me", &[]).await?;
        Ok(envelope.user)
    }
}

#[async_trait]
impl SessionApi for InkdropClient {
    async fn start_session(&self, request: &StartSessionRequest) -> ApiResult<ReadingSession> {
        let envelope: SessionEnvelope = self.post("/api/sessions/start", request).await?;
        Ok(envelope.session)
    }

    async fn end_session(
        &self,
        session_id: &str,
        request: &EndSessionRequest,
    ) -> ApiResult<ReadingSession> {
        let path = format!("/api/sessions/{session_id}/end");
        let envelope: SessionEnvelope = self.post(&path, request).await?;
        Ok(envelope.session)
    }

    async fn list_sessions(&self, filters: &SessionFilters) -> ApiResult<SessionPage> {
        self.get("/api/sessions", &filters.to_query()).await
    }

    async fn overall_stats(&self) -> ApiResult<OverallStats> {
        self.get("/api/sessions/stats", &[]).await
    }

    async fn daily_stats(&self, days: u32) -> ApiResult<Vec<DailyStat>> {
        self.get("/api/sessions/stats/daily", &[("days", days.to_string())])
            .await
    }

    async fn weekly_stats(&self, weeks: u32) -> ApiResult<Vec<WeeklyStat>> {
        self.get("/api/sessions/stats/weekly", &[("weeks", weeks.to_string())])
            .await
    }

    async fn monthly_stats(&self, months: u32) -> ApiResult<Vec<MonthlyStat>> {
        self.get(
            "/api/sessions/stats/monthly",
            &[("months", months.to_string())],
        )
        .await
    }

    async fn calendar(&self, year: i32, month: u32) -> ApiResult<CalendarMonth> {
        self.get(
            "/api/sessions/calendar",
            &[("year", year.to_string()), ("month", month.to_string())],
        )
        .await
    }

    async fn leaderboard(&self, limit: u32) -> ApiResult<Vec<ReadingLeaderboardEntry>> {
        let envelope: LeaderboardEnvelope<ReadingLeaderboardEntry> = self
            .get("/api/sessions/leaderboard", &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.leaderboard)
    }
}

#[async_trait]
impl StreakApi for InkdropClient {
    async fn streak(&self) -> ApiResult<Streak> {
        let envelope: StreakEnvelope = self.get("/api/streaks", &[]).await?;
        Ok(envelope.streak)
    }

    async fn check_in(&self) -> ApiResult<CheckInResponse> {
        self.send_json(
            Method::POST,
            "/api/streaks/check-in",
            &serde_json::json!({}),
            RequestOptions::with_timeout(self.check_in_timeout),
        )
        .await
    }

    async fn restore(&self) -> ApiResult<RestoreResponse> {
        self.post("/api/streaks/restore", &serde_json::json!({}))
            .await
    }

    async fn today_challenge(&self) -> ApiResult<Option<DailyChallenge>> {
        let envelope: Option<ChallengeEnvelope> = self
            .get("/api/gamification/challenges/today", &[])
            .await?;
        Ok(envelope.and_then(|e| e.challenge))
    }

    async fn leaderboard(
        &self,
        period: LeaderboardPeriod,
    ) -> ApiResult<Vec<StreakLeaderboardEntry>> {
        let envelope: LeaderboardEnvelope<StreakLeaderboardEntry> = self
            .get(
                "/api/streaks/leaderboard",
                &[("period", period.as_str().to_string())],
            )
            .await?;
        Ok(envelope.leaderboard)
    }
}
