//! Type-safe identifiers for driver entities.
//!
//! Newtype wrappers keep element references and browsing-context handles
//! from being mixed up. Both are opaque strings owned by the driver.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ElementId
// ============================================================================

/// Opaque reference to a live DOM element.
///
/// Only meaningful to the driver that produced it. A reference goes stale
/// once its document is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Creates an element ID from a driver-issued string.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<ElementId> for ElementId {
    fn as_ref(&self) -> &ElementId {
        self
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// WindowHandle
// ============================================================================

/// Opaque handle to a browsing context (tab or window).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(String);

impl WindowHandle {
    /// Creates a handle from a driver-issued string.
    #[inline]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the handle as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
