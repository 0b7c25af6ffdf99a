// SPDX-License-Identifier: MPL-2.0

mod db;
mod schema;

pub use db::Storage;

use thiserror::Error;

/// Storage keys shared by the stores that persist state
pub mod keys {
    pub const AUTH_TOKEN: &str = "auth.token";
    pub const AUTH_USER: &str = "auth.user";
    pub const CHAT_PREFERENCES: &str = "chat.preferences";
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage path error: {0}")]
    Path(String),
    #[error("storage lock poisoned")]
    Poisoned,
}
