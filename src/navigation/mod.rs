//! Navigation context tracking.
//!
//! An action may navigate the focused context, open a new one, or do
//! nothing observable. The tracker classifies which happened and can put
//! the session back to its pre-action baseline, so that independent test
//! steps do not leak browsing contexts into one another.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `context` | `ContextSet`, `WindowContext`, events, outcomes, domain policy |
//! | `tracker` | `perform_and_classify`, `restore`, `visit`, `landed_on` on [`Session`](crate::Session) |
//!
//! # Example
//!
//! ```ignore
//! let twitter = session.require(&LocatorSpec::new(By::class("social_twitter"))).await?;
//!
//! let event = session.click_and_classify(&twitter).await?.into_event()?;
//! assert_eq!(event.classification, Classification::NewContext);
//! assert!(session.landed_on(&event, "twitter.com"));
//!
//! session.restore(&event).await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod context;
mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::{
    Classification, ContextSet, DomainMatch, NavigationEvent, NavigationOutcome, WindowContext,
};
