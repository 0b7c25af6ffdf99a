// SPDX-License-Identifier: MPL-2.0

use crate::storage::{Storage, StorageError, keys};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat text size as a scale factor (1.0 = default)
/// Slider steps: 0.8, 0.85, 0.9, 0.95, 1.0, 1.05, 1.1, 1.15, 1.2
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSize(pub f64);

impl FontSize {
    pub const STEPS: &'static [f64] = &[0.8, 0.85, 0.9, 0.95, 1.0, 1.05, 1.1, 1.15, 1.2];
    /// Bubble text names shown next to the slider, one per step
    const LABELS: [&'static str; 9] = [
        "Tiny", "Compact", "Small", "Cozy", "Default", "Roomy", "Large", "Larger", "Huge",
    ];
    pub const MIN: f64 = 0.8;
    pub const MAX: f64 = 1.2;
    pub const DEFAULT: f64 = 1.0;

    /// Snap an arbitrary value to the closest slider step.
    pub fn snapped(value: f64) -> Self {
        let clamped = if value.is_finite() {
            value.clamp(Self::MIN, Self::MAX)
        } else {
            Self::DEFAULT
        };
        let step = Self::STEPS
            .iter()
            .copied()
            .min_by(|a, b| (a - clamped).abs().total_cmp(&(b - clamped).abs()))
            .unwrap_or(Self::DEFAULT);
        Self(step)
    }

    pub fn scale_factor(self) -> f64 {
        self.0
    }

    pub fn label(self) -> &'static str {
        let step = Self::snapped(self.0).0;
        Self::STEPS
            .iter()
            .position(|s| *s == step)
            .and_then(|i| Self::LABELS.get(i))
            .copied()
            .unwrap_or("Default")
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatTheme {
    #[default]
    Light,
    Dark,
    Sepia,
    Midnight,
}

impl ChatTheme {
    pub const ALL: [ChatTheme; 4] = [Self::Light, Self::Dark, Self::Sepia, Self::Midnight];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Sepia => "sepia",
            Self::Midnight => "midnight",
        }
    }
}

impl fmt::Display for ChatTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown chat theme: {s}"))
    }
}

/// Persistent chat appearance preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreferences {
    #[serde(default)]
    pub theme: ChatTheme,
    #[serde(default)]
    pub text_scale: FontSize,
}

impl ChatPreferences {
    /// Load preferences, or return defaults if missing or unreadable
    pub fn load(storage: &Storage) -> Self {
        match storage.get::<Self>(keys::CHAT_PREFERENCES) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "chat preferences unreadable, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &Storage) -> Result<(), StorageError> {
        storage.set(keys::CHAT_PREFERENCES, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_snaps_to_steps() {
        assert_eq!(FontSize::snapped(1.03), FontSize(1.05));
        assert_eq!(FontSize::snapped(0.1), FontSize(0.8));
        assert_eq!(FontSize::snapped(9.0), FontSize(1.2));
        assert_eq!(FontSize::snapped(f64::NAN), FontSize::default());
        assert_eq!(FontSize::snapped(0.9).label(), "Small");
        assert_eq!(FontSize::default().label(), "Default");
        // Off-step values are named after their nearest step
        assert_eq!(FontSize(1.19).label(), "Huge");
        assert_eq!(FontSize(0.83).label(), "Compact");
    }

    #[test]
    fn test_theme_parsing() {
        assert_eq!("Midnight".parse::<ChatTheme>().unwrap(), ChatTheme::Midnight);
        assert_eq!(" sepia ".parse::<ChatTheme>().unwrap(), ChatTheme::Sepia);
        assert!("neon".parse::<ChatTheme>().is_err());
        assert_eq!(ChatTheme::Dark.to_string(), "dark");
    }

    #[test]
    fn test_preferences_round_trip_through_storage() {
        let storage = Storage::in_memory().unwrap();
        assert_eq!(ChatPreferences::load(&storage), ChatPreferences::default());

        let prefs = ChatPreferences {
            theme: ChatTheme::Sepia,
            text_scale: FontSize(1.15),
        };
        prefs.save(&storage).unwrap();
        assert_eq!(ChatPreferences::load(&storage), prefs);
    }

    #[test]
    fn test_corrupt_preferences_fall_back_to_defaults() {
        let storage = Storage::in_memory().unwrap();
        storage
            .set(keys::CHAT_PREFERENCES, &serde_json::json!({ "theme": "neon" }))
            .unwrap();
        assert_eq!(ChatPreferences::load(&storage), ChatPreferences::default());

        storage
            .set(keys::CHAT_PREFERENCES, &serde_json::json!({ "theme": "dark" }))
            .unwrap();
        let prefs = ChatPreferences::load(&storage);
        assert_eq!(prefs.theme, ChatTheme::Dark);
        assert_eq!(prefs.text_scale, FontSize::default());
    }
}
