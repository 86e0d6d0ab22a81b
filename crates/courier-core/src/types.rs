// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Type definitions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings (GUI-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Default toast lifetime in milliseconds (default: 3000)
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    /// Name shown on this device when no user is signed in
    pub driver_name: String,
    /// Fetch the notification inbox after sign-in
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,
    /// Theme preference: "dark", "light", or "system"
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_toast_duration_ms() -> u64 {
    3000
}

fn default_notifications_enabled() -> bool {
    true
}

fn default_theme() -> String {
    "system".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            toast_duration_ms: default_toast_duration_ms(),
            driver_name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "Courier Device".to_string()),
            notifications_enabled: default_notifications_enabled(),
            theme: default_theme(),
        }
    }
}

impl AppSettings {
    /// Default toast lifetime as a `Duration`; zero falls back to 3000 ms
    pub fn toast_duration(&self) -> Duration {
        match self.toast_duration_ms {
            0 => Duration::from_millis(default_toast_duration_ms()),
            ms => Duration::from_millis(ms),
        }
    }
}

/// Error types for the application
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("User is not authenticated")]
    NotAuthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Text shown to the user in an error toast
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotAuthenticated => "You need to sign in first".to_string(),
            AppError::InvalidInput(reason)
            | AppError::Auth(reason)
            | AppError::Backend(reason) => reason.clone(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::FileIo(_) | AppError::Serialization(_) => {
                "Could not save local data".to_string()
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}
