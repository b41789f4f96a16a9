//! Session timing and behaviour configuration.
//!
//! Provides a type-safe interface for the budgets every engine operation
//! runs under, plus the switches for the recovery behaviours.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use resilient_driver::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_default_timeout(Duration::from_secs(5))
//!     .with_poll_interval(Duration::from_millis(100))
//!     .without_script_click_fallback();
//!
//! // Or from a JSON file with millisecond keys:
//! // { "default_timeout_ms": 5000, "poll_interval_ms": 100 }
//! let options = SessionOptions::from_file("session.json")?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::navigation::DomainMatch;

// ============================================================================
// Constants
// ============================================================================

/// Default budget for wait conditions (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between predicate evaluations (200 milliseconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// SessionOptions
// ============================================================================

/// Budgets and switches shared by every operation on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Budget for waits that do not specify their own.
    #[serde(rename = "default_timeout_ms", with = "duration_ms")]
    pub default_timeout: Duration,

    /// Delay between predicate evaluations.
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,

    /// Budget for an element to become visible and enabled before acting.
    #[serde(rename = "interactable_timeout_ms", with = "duration_ms")]
    pub interactable_timeout: Duration,

    /// Budget for an action to produce a navigational signal.
    #[serde(rename = "navigation_timeout_ms", with = "duration_ms")]
    pub navigation_timeout: Duration,

    /// Budget for returning the session to its baseline.
    #[serde(rename = "restore_timeout_ms", with = "duration_ms")]
    pub restore_timeout: Duration,

    /// Scroll targets to the viewport centre before clicking.
    pub scroll_into_view: bool,

    /// Retry intercepted clicks through the page's scripting context.
    pub script_click_fallback: bool,

    /// How expected domains are compared against context URLs.
    pub domain_match: DomainMatch,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            interactable_timeout: DEFAULT_TIMEOUT,
            navigation_timeout: DEFAULT_TIMEOUT,
            restore_timeout: DEFAULT_TIMEOUT,
            scroll_into_view: true,
            script_click_fallback: true,
            domain_match: DomainMatch::Substring,
        }
    }

    /// Parses options from JSON. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed input and [`Error::Config`]
    /// if the result fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the default wait budget.
    #[inline]
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the polling interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the interactable budget.
    #[inline]
    #[must_use]
    pub fn with_interactable_timeout(mut self, timeout: Duration) -> Self {
        self.interactable_timeout = timeout;
        self
    }

    /// Sets the navigation signal budget.
    #[inline]
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Sets the restore budget.
    #[inline]
    #[must_use]
    pub fn with_restore_timeout(mut self, timeout: Duration) -> Self {
        self.restore_timeout = timeout;
        self
    }

    /// Disables scrolling before clicks.
    #[inline]
    #[must_use]
    pub fn without_scroll_into_view(mut self) -> Self {
        self.scroll_into_view = false;
        self
    }

    /// Disables the scripted click fallback.
    #[inline]
    #[must_use]
    pub fn without_script_click_fallback(mut self) -> Self {
        self.script_click_fallback = false;
        self
    }

    /// Sets the domain comparison policy.
    #[inline]
    #[must_use]
    pub fn with_domain_match(mut self, policy: DomainMatch) -> Self {
        self.domain_match = policy;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionOptions {
    /// Checks that every budget can actually be polled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the poll interval is zero or larger
    /// than any budget it governs.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("poll_interval must be greater than zero"));
        }

        let budgets = [
            ("default_timeout", self.default_timeout),
            ("interactable_timeout", self.interactable_timeout),
            ("navigation_timeout", self.navigation_timeout),
            ("restore_timeout", self.restore_timeout),
        ];
        for (name, budget) in budgets {
            if budget < self.poll_interval {
                return Err(Error::config(format!(
                    "{name} ({}ms) is shorter than poll_interval ({}ms)",
                    budget.as_millis(),
                    self.poll_interval.as_millis()
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::new();
        assert_eq!(options.default_timeout, DEFAULT_TIMEOUT);
        assert_eq!(options.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(options.script_click_fallback);
        assert_eq!(options.domain_match, DomainMatch::Substring);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let options = SessionOptions::new()
            .with_default_timeout(Duration::from_secs(3))
            .with_poll_interval(Duration::from_millis(50))
            .without_scroll_into_view()
            .with_domain_match(DomainMatch::Host);

        assert_eq!(options.default_timeout, Duration::from_secs(3));
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert!(!options.scroll_into_view);
        assert_eq!(options.domain_match, DomainMatch::Host);
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            SessionOptions::from_json_str(r#"{"default_timeout_ms": 2500, "domain_match": "host"}"#)
                .unwrap();
        assert_eq!(options.default_timeout, Duration::from_millis(2500));
        assert_eq!(options.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(options.domain_match, DomainMatch::Host);
    }

    #[test]
    fn test_json_uses_millisecond_keys() {
        let json = serde_json::to_value(SessionOptions::new()).unwrap();
        assert_eq!(json["poll_interval_ms"], 200);
        assert_eq!(json["restore_timeout_ms"], 10_000);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = SessionOptions::from_json_str(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_poll_longer_than_budget_rejected() {
        let options = SessionOptions::new()
            .with_restore_timeout(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(500));
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("restore_timeout"));
    }
}
