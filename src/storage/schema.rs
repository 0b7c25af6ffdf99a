// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the on-device key-value store
pub const SCHEMA: &str = r#"
PRAGMA user_version = 1;

-- kv: JSON-encoded values keyed by name (auth token, user profile, preferences)
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
