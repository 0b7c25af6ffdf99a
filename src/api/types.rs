// SPDX-License-Identifier: MPL-2.0

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Decoupled from the backend's internal representation so we own the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Ink-drop currency balance
    #[serde(default)]
    pub ink_drops: u64,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

/// A reading session as the server reports it.
///
/// Duration, pages read, speed, focus score and ink drops are computed by the
/// backend and carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub id: String,
    pub book_id: String,
    pub bookshelf_item_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub start_page: u32,
    #[serde(default)]
    pub end_page: Option<u32>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub pages_read: Option<u32>,
    /// Pages per hour
    #[serde(default)]
    pub reading_speed: Option<f64>,
    #[serde(default)]
    pub focus_score: Option<f64>,
    #[serde(default)]
    pub ink_drops_earned: Option<u32>,
    #[serde(default)]
    pub pause_count: u32,
    /// Seconds
    #[serde(default)]
    pub total_pause_duration: f64,
}

impl ReadingSession {
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub book_id: String,
    pub bookshelf_item_id: String,
    pub start_page: u32,
}

/// Payload sent once when a session ends. Pause durations are seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    pub end_page: u32,
    pub pause_count: u32,
    pub total_pause_duration: f64,
    pub average_pause_duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionEnvelope {
    pub session: ReadingSession,
}

/// Server-side pagination block, trusted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub sessions: Vec<ReadingSession>,
    pub pagination: Pagination,
}

/// Query filters for the session history list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilters {
    pub book_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl SessionFilters {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(book_id) = &self.book_id {
            query.push(("bookId", book_id.clone()));
        }
        if let Some(from) = self.from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = self.to {
            query.push(("to", to.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query.push(("offset", self.offset.to_string()));
        query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_sessions: u32,
    /// Seconds
    pub total_reading_time: u64,
    pub total_pages_read: u32,
    #[serde(default)]
    pub average_session_duration: f64,
    #[serde(default)]
    pub average_reading_speed: f64,
    #[serde(default)]
    pub average_focus_score: f64,
    #[serde(default)]
    pub total_ink_drops_earned: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub sessions: u32,
    pub reading_time: u64,
    pub pages_read: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStat {
    pub week_start: NaiveDate,
    pub sessions: u32,
    pub reading_time: u64,
    pub pages_read: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    /// "YYYY-MM"
    pub month: String,
    pub sessions: u32,
    pub reading_time: u64,
    pub pages_read: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub sessions: u32,
    pub reading_time: u64,
    #[serde(default)]
    pub checked_in: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingLeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub total_reading_time: u64,
    pub total_pages_read: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneStatus {
    pub achieved: bool,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    #[serde(default)]
    pub day7: MilestoneStatus,
    #[serde(default)]
    pub day30: MilestoneStatus,
    #[serde(default)]
    pub day100: MilestoneStatus,
    #[serde(default)]
    pub day365: MilestoneStatus,
}

impl Milestones {
    /// Milestone thresholds in days, paired with their status
    pub fn iter(&self) -> impl Iterator<Item = (u32, &MilestoneStatus)> {
        [
            (7, &self.day7),
            (30, &self.day30),
            (100, &self.day100),
            (365, &self.day365),
        ]
        .into_iter()
    }

    /// The smallest threshold not achieved yet
    pub fn next_target(&self) -> Option<u32> {
        self.iter().find(|(_, s)| !s.achieved).map(|(days, _)| days)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(default)]
    pub last_check_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_check_ins: u32,
    #[serde(default)]
    pub can_restore: bool,
    #[serde(default)]
    pub milestones: Milestones,
}

impl Streak {
    /// The local guess of what a successful check-in will produce.
    pub fn optimistic_check_in(&self, now: DateTime<Utc>) -> Self {
        let current_streak = self.current_streak.saturating_add(1);
        Self {
            current_streak,
            longest_streak: self.longest_streak.max(current_streak),
            last_check_in: Some(now),
            ..self.clone()
        }
    }

    pub fn checked_in_on(&self, day: NaiveDate) -> bool {
        self.last_check_in.is_some_and(|t| t.date_naive() == day)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StreakEnvelope {
    pub streak: Streak,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub success: bool,
    #[serde(default)]
    pub ink_drops_earned: u32,
    /// Milestone threshold in days reached by this check-in
    #[serde(default)]
    pub milestone_achieved: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub success: bool,
    #[serde(default)]
    pub ink_drops_spent: u32,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target: u32,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub reward: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChallengeEnvelope {
    pub challenge: Option<DailyChallenge>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaderboardPeriod {
    #[default]
    Weekly,
    Monthly,
    AllTime,
}

impl LeaderboardPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::AllTime => "allTime",
        }
    }
}

impl std::str::FromStr for LeaderboardPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "all" | "allTime" | "all-time" => Ok(Self::AllTime),
            other => Err(format!("unknown leaderboard period '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakLeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LeaderboardEnvelope<T> {
    pub leaderboard: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_streak_decodes_camel_case() {
        let json = r#"{
            "currentStreak": 5,
            "longestStreak": 12,
            "lastCheckIn": "2026-10-18T08:30:00Z",
            "totalCheckIns": 40,
            "canRestore": false,
            "milestones": {
                "day7": { "achieved": true, "date": "2026-03-01T00:00:00Z" },
                "day30": { "achieved": false }
            }
        }"#;
        let streak: Streak = serde_json::from_str(json).unwrap();
        assert_eq!(streak.current_streak, 5);
        assert_eq!(streak.longest_streak, 12);
        assert!(streak.milestones.day7.achieved);
        assert!(!streak.milestones.day365.achieved);
        assert_eq!(streak.milestones.next_target(), Some(30));
    }

    #[test]
    fn test_optimistic_check_in_increments_and_stamps() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let streak = Streak {
            current_streak: 5,
            longest_streak: 5,
            ..Streak::default()
        };
        let optimistic = streak.optimistic_check_in(now);
        assert_eq!(optimistic.current_streak, 6);
        assert_eq!(optimistic.longest_streak, 6);
        assert_eq!(optimistic.last_check_in, Some(now));
        assert!(optimistic.checked_in_on(now.date_naive()));
        assert!(!streak.checked_in_on(now.date_naive()));
    }

    #[test]
    fn test_session_finished_once_end_time_set() {
        let mut session: ReadingSession = serde_json::from_value(serde_json::json!({
            "id": "sess-1", "bookId": "b1", "bookshelfItemId": "s1",
            "startTime": "2026-10-19T08:00:00Z", "startPage": 10
        }))
        .unwrap();
        assert!(!session.is_finished());
        session.end_time = Some(session.start_time + chrono::Duration::minutes(45));
        assert!(session.is_finished());
    }

    #[test]
    fn test_end_session_request_uses_wire_names() {
        let body = EndSessionRequest {
            end_page: 40,
            pause_count: 2,
            total_pause_duration: 75.0,
            average_pause_duration: 37.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["endPage"], 40);
        assert_eq!(json["pauseCount"], 2);
        assert_eq!(json["averagePauseDuration"], 37.5);
    }

    #[test]
    fn test_session_filters_query() {
        let filters = SessionFilters {
            book_id: Some("b1".to_string()),
            limit: Some(10),
            offset: 20,
            ..SessionFilters::default()
        };
        let query = filters.to_query();
        assert!(query.contains(&("bookId", "b1".to_string())));
        assert!(query.contains(&("limit", "10".to_string())));
        assert!(query.contains(&("offset", "20".to_string())));
        assert_eq!(query.len(), 3);
    }

    #[test]
    fn test_leaderboard_period_parse() {
        assert_eq!("weekly".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::Weekly));
        assert_eq!("all-time".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::AllTime));
        assert!("yearly".parse::<LeaderboardPeriod>().is_err());
    }
}
