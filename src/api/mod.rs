// SPDX-License-Identifier: MPL-2.0

mod client;
#[cfg(test)]
pub mod fake;
mod services;
mod types;

pub use client::{ApiError, InkdropClient, RequestOptions, TokenCell};
pub use services::{ApiResult, AuthApi, SessionApi, StreakApi};
pub use types::{
    AuthResponse, CalendarDay, CalendarMonth, CheckInResponse, DailyChallenge, DailyStat,
    EndSessionRequest, LeaderboardPeriod, LoginRequest, MilestoneStatus, Milestones, MonthlyStat,
    OverallStats, Pagination, ReadingLeaderboardEntry, ReadingSession, RegisterRequest,
    RestoreResponse, SessionFilters, SessionPage, StartSessionRequest, Streak,
    StreakLeaderboardEntry, User, WeeklyStat,
};
