//! Primitive conditions for [`Wait`](super::Wait).
//!
//! Each function evaluates once against the current session state. Compose
//! them with `||` and `&&` inside a wait predicate.

use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ElementId;
use crate::locator::LocatorSpec;
use crate::session::Session;

// ============================================================================
// Document
// ============================================================================

/// Document finished loading (`document.readyState === "complete"`).
pub async fn document_ready(session: &Session) -> Result<bool> {
    let state = session
        .execute_script("return document.readyState", &[])
        .await?;
    trace!(ready_state = ?state, "Document state");
    Ok(state.as_str() == Some("complete"))
}

/// Document has a `<body>` element.
pub async fn body_present(session: &Session) -> Result<bool> {
    present(session, &LocatorSpec::new(crate::By::tag("body"))).await
}

/// Document title contains `fragment`.
pub async fn title_contains(session: &Session, fragment: &str) -> Result<bool> {
    Ok(session.title().await?.contains(fragment))
}

/// Document title equals `expected`.
pub async fn title_equals(session: &Session, expected: &str) -> Result<bool> {
    Ok(session.title().await? == expected)
}

// ============================================================================
// URL
// ============================================================================

/// Focused URL differs from `previous`.
pub async fn url_changed_from(session: &Session, previous: &str) -> Result<bool> {
    Ok(session.current_url().await? != previous)
}

/// Focused URL contains `fragment`.
pub async fn url_contains(session: &Session, fragment: &str) -> Result<bool> {
    Ok(session.current_url().await?.contains(fragment))
}

/// Focused URL equals `expected`.
pub async fn url_equals(session: &Session, expected: &str) -> Result<bool> {
    Ok(session.current_url().await? == expected)
}

/// Focused URL matches `pattern` anywhere.
pub async fn url_matches(session: &Session, pattern: &Regex) -> Result<bool> {
    Ok(pattern.is_match(&session.current_url().await?))
}

// ============================================================================
// Elements
// ============================================================================

/// Some candidate of `spec` matches.
pub async fn present(session: &Session, spec: &LocatorSpec) -> Result<bool> {
    Ok(session.resolve(spec).await?.is_some())
}

/// `spec` resolves to a displayed element.
pub async fn visible(session: &Session, spec: &LocatorSpec) -> Result<bool> {
    match session.resolve(spec).await? {
        Some(resolved) => session.is_displayed(&resolved).await,
        None => Ok(false),
    }
}

/// No candidate of `spec` matches.
pub async fn absent(session: &Session, spec: &LocatorSpec) -> Result<bool> {
    Ok(session.resolve(spec).await?.is_none())
}

/// `spec` is absent or resolves to an element that is not displayed.
///
/// An element whose document was replaced mid-check counts as invisible.
pub async fn invisible(session: &Session, spec: &LocatorSpec) -> Result<bool> {
    let Some(resolved) = session.resolve(spec).await? else {
        return Ok(true);
    };
    match session.is_displayed(&resolved).await {
        Ok(displayed) => Ok(!displayed),
        Err(Error::StaleElement { .. }) => Ok(true),
        Err(err) => Err(err),
    }
}

/// Some element matched by `spec` has text containing `text`.
pub async fn text_present(session: &Session, spec: &LocatorSpec, text: &str) -> Result<bool> {
    let Some(resolved) = session.resolve(spec).await? else {
        return Ok(false);
    };
    Ok(session.text(&resolved).await?.contains(text))
}

/// `element` no longer belongs to a live document.
///
/// Typically awaited after an action to confirm the page was replaced.
pub async fn stale(session: &Session, element: &ElementId) -> Result<bool> {
    match session.is_enabled(element).await {
        Ok(_) => Ok(false),
        Err(Error::StaleElement { .. }) => {
            trace!(element = %element, "Element went stale");
            Ok(true)
        }
        Err(err) => Err(err),
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// More than `count` browsing contexts are open.
pub async fn context_count_above(session: &Session, count: usize) -> Result<bool> {
    Ok(session.window_handles().await?.len() > count)
}

/// Exactly `count` browsing contexts are open.
pub async fn context_count_equals(session: &Session, count: usize) -> Result<bool> {
    Ok(session.window_handles().await?.len() == count)
}

// ============================================================================
// Tests
// ============================================================================
