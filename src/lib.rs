// SPDX-License-Identifier: MPL-2.0

pub mod api;
pub mod app;
pub mod config;
pub mod runtime;
pub mod state;
pub mod storage;

pub use app::{App, AppError};
pub use config::Config;
