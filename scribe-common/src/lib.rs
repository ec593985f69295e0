//! Common types and utilities shared across Scribe crates.
//!
//! This crate defines the shared error taxonomy, the platform enum stored
//! alongside linked accounts, and observability helpers used throughout the
//! Scribe workspace. It is intentionally lightweight so that every crate can
//! depend on it without pulling in heavy transitive costs.
//!
//! # Overview
//!
//! - [`ScribeError`] and [`Result`]: the failure kinds a publish run can
//!   surface to callers
//! - [`Platform`]: which blogging platform a stored credential belongs to
//! - [`observability`]: centralised tracing/logging initialisation
use serde::{Deserialize, Serialize};

pub mod observability;

/// Platform a linked account belongs to.
///
/// Stored with each credential. The publish workflow currently automates
/// Naver Blog only; the value is kept as data so additional platforms can
/// be linked without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    NaverBlog,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::NaverBlog => "naver-blog",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = ScribeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "naver-blog" => Ok(Platform::NaverBlog),
            other => Err(ScribeError::Config(format!(
                "unknown platform: {other:?} (expected naver-blog)"
            ))),
        }
    }
}

/// Failure kinds surfaced by a publish invocation.
///
/// A run either returns the published URL or exactly one of these; partial
/// progress is never reported. `AccountNotConfigured` and
/// `SecretUnavailable` are distinct so callers can tell "needs re-linking"
/// apart from a crypto fault.
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    /// No credential is linked for the requested store.
    #[error("no credential linked for store {0}")]
    AccountNotConfigured(i64),

    /// A stored secret exists but could not be decrypted.
    #[error("stored secret could not be recovered: {0}")]
    SecretUnavailable(String),

    /// An expected page, frame, field or control never appeared within its
    /// bounded wait. Carries the workflow step for diagnostics.
    #[error("navigation failed during {step}: {reason}")]
    Navigation { step: &'static str, reason: String },

    /// Every click strategy failed for a control that was found.
    #[error("all click strategies failed for {0}")]
    Interaction(String),

    /// A deadline-bound search exhausted its budget without success.
    #[error("deadline exceeded while {0}")]
    DeadlineExceeded(String),

    /// The publish flow completed without error but the page URL never
    /// changed, so the post cannot be confirmed as published.
    #[error("publish not confirmed: page URL never changed")]
    Verification,

    /// The underlying browser session reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential store reported an error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenient alias for results that use [`ScribeError`].
pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn platform_round_trips_through_str() {
        let p = Platform::from_str(Platform::NaverBlog.as_str()).unwrap();
        assert_eq!(p, Platform::NaverBlog);
        assert!(Platform::from_str("wordpress").is_err());
    }

    #[test]
    fn error_messages_name_the_step() {
        let err = ScribeError::Navigation {
            step: "editor-frame",
            reason: "frame never appeared".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("editor-frame"));
        assert!(rendered.contains("never appeared"));
    }
}
