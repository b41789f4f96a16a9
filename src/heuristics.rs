//! State judgments from several weak signals.
//!
//! Markup that proves a state ("logged in", "cart not empty") differs
//! between deployments, so no single marker is trusted. A
//! [`StateHeuristic`] lists independent signals and combines them, by
//! default accepting any positive one as evidence.
//!
//! Evaluate only once the document has loaded; [`StateHeuristic::evaluate_when_ready`]
//! waits for that first.
//!
//! # Example
//!
//! ```ignore
//! let judgment = StateHeuristic::logged_in().evaluate_when_ready(&session).await?;
//! assert!(judgment.holds, "not logged in, signals: {judgment}");
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::locator::{By, LocatorSpec};
use crate::session::Session;
use crate::wait::conditions;

// ============================================================================
// Free-standing Evaluation
// ============================================================================

/// OR-combines plain predicates.
///
/// Returns `true` as soon as one predicate does; an empty list is `false`.
///
/// # Example
///
/// ```ignore
/// assert!(evaluate([|| false, || true]));
/// ```
pub fn evaluate<I, F>(signals: I) -> bool
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> bool,
{
    signals.into_iter().any(|signal| signal())
}

// ============================================================================
// Combine
// ============================================================================

/// How signal results are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Combine {
    /// At least one signal fired.
    #[default]
    Any,
    /// Every signal fired.
    All,
}

// ============================================================================
// Signal
// ============================================================================

type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;
type Probe = Arc<dyn for<'a> Fn(&'a Session) -> BoxFuture<'a, Result<bool>> + Send + Sync>;

/// Observation a signal makes.
#[derive(Clone)]
enum SignalKind {
    UrlContains(String),
    UrlMatches(Regex),
    TitleContains(String),
    Present(LocatorSpec),
    Displayed(LocatorSpec),
    Absent(LocatorSpec),
    CountAtLeast(LocatorSpec, usize),
    Custom(Predicate),
    Probe(Probe),
}

/// One named, individually unreliable observation.
#[derive(Clone)]
pub struct Signal {
    name: String,
    kind: SignalKind,
}

impl Signal {
    /// Focused URL contains `fragment`.
    pub fn url_contains(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::with_kind(name, SignalKind::UrlContains(fragment.into()))
    }

    /// Focused URL matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `pattern` is not a valid regex.
    pub fn url_matches(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::invalid_argument(format!("url pattern {pattern:?}: {e}")))?;
        Ok(Self::with_kind(name, SignalKind::UrlMatches(regex)))
    }

    /// Document title contains `fragment`.
    pub fn title_contains(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::with_kind(name, SignalKind::TitleContains(fragment.into()))
    }

    /// `spec` resolves.
    pub fn present(name: impl Into<String>, spec: LocatorSpec) -> Self {
        Self::with_kind(name, SignalKind::Present(spec))
    }

    /// `spec` resolves to a displayed element.
    pub fn displayed(name: impl Into<String>, spec: LocatorSpec) -> Self {
        Self::with_kind(name, SignalKind::Displayed(spec))
    }

    /// `spec` does not resolve.
    pub fn absent(name: impl Into<String>, spec: LocatorSpec) -> Self {
        Self::with_kind(name, SignalKind::Absent(spec))
    }

    /// The winning candidate of `spec` has at least `min` matches.
    pub fn count_at_least(name: impl Into<String>, spec: LocatorSpec, min: usize) -> Self {
        Self::with_kind(name, SignalKind::CountAtLeast(spec, min))
    }

    /// A plain predicate that does not touch the session.
    pub fn custom(name: impl Into<String>, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self::with_kind(name, SignalKind::Custom(Arc::new(predicate)))
    }

    /// An async predicate over the session.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let badge = Signal::probe("cart badge", |session| {
    ///     Box::pin(async move {
    ///         let badge = LocatorSpec::new(By::class("shopping_cart_badge"));
    ///         Ok(match session.resolve(&badge).await? {
    ///             Some(el) => session.text(&el).await? != "0",
    ///             None => false,
    ///         })
    ///     })
    /// });
    /// ```
    pub fn probe<F>(name: impl Into<String>, probe: F) -> Self
    where
        F: for<'a> Fn(&'a Session) -> BoxFuture<'a, Result<bool>> + Send + Sync + 'static,
    {
        Self::with_kind(name, SignalKind::Probe(Arc::new(probe)))
    }

    fn with_kind(name: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Returns the signal's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes one observation.
    pub async fn observe(&self, session: &Session) -> Result<bool> {
        match &self.kind {
            SignalKind::UrlContains(fragment) => conditions::url_contains(session, fragment).await,
            SignalKind::UrlMatches(regex) => Ok(regex.is_match(&session.current_url().await?)),
            SignalKind::TitleContains(fragment) => Ok(session.title().await?.contains(fragment.as_str())),
            SignalKind::Present(spec) => conditions::present(session, spec).await,
            SignalKind::Displayed(spec) => conditions::visible(session, spec).await,
            SignalKind::Absent(spec) => conditions::absent(session, spec).await,
            SignalKind::CountAtLeast(spec, min) => Ok(session
                .resolve_all(spec)
                .await?
                .is_some_and(|all| all.len() >= *min)),
            SignalKind::Custom(predicate) => Ok(predicate()),
            SignalKind::Probe(probe) => probe(session).await,
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SignalKind::UrlContains(fragment) => format!("url_contains({fragment})"),
            SignalKind::UrlMatches(regex) => format!("url_matches({})", regex.as_str()),
            SignalKind::TitleContains(fragment) => format!("title_contains({fragment})"),
            SignalKind::Present(spec) => format!("present({spec})"),
            SignalKind::Displayed(spec) => format!("displayed({spec})"),
            SignalKind::Absent(spec) => format!("absent({spec})"),
            SignalKind::CountAtLeast(spec, min) => format!("count_at_least({spec}, {min})"),
            SignalKind::Custom(_) => "custom".to_string(),
            SignalKind::Probe(_) => "probe".to_string(),
        };
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

// ============================================================================
// Judgment
// ============================================================================

/// Result of evaluating a heuristic, with the signals that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    /// Whether the state is judged to hold.
    pub holds: bool,
    /// Names of the signals that returned `true`.
    pub fired: Vec<String>,
    /// Number of signals evaluated.
    pub evaluated: usize,
}

impl fmt::Display for Judgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/{} fired: [{}])",
            self.holds,
            self.fired.len(),
            self.evaluated,
            self.fired.join(", ")
        )
    }
}

// ============================================================================
// StateHeuristic
// ============================================================================

/// Named, enumerable list of signals for one application state.
#[derive(Debug, Clone)]
pub struct StateHeuristic {
    name: String,
    signals: Vec<Signal>,
    combine: Combine,
}

impl StateHeuristic {
    /// Creates an empty heuristic combined with [`Combine::Any`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signals: Vec::new(),
            combine: Combine::Any,
        }
    }

    /// Adds a signal.
    #[must_use]
    pub fn signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Sets how signals are combined.
    #[must_use]
    pub fn combine(mut self, combine: Combine) -> Self {
        self.combine = combine;
        self
    }

    /// Returns the heuristic's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the signals in evaluation order.
    #[inline]
    #[must_use]
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Markers of an authenticated session seen across deployments:
    /// a logout link, an account summary block, or an account-area URL.
    #[must_use]
    pub fn logged_in() -> Self {
        let logout = LocatorSpec::new(By::link_text("Logout"))
            .or(By::link_text("Log out"))
            .or(By::partial_link_text("Sign out"))
            .or(By::id("logout_sidebar_link"));

        let mut heuristic = Self::new("logged in")
            .signal(Signal::present("logout link", logout))
            .signal(Signal::present(
                "account summary",
                LocatorSpec::new(By::id("accountSummary")).or(By::class("account-summary")),
            ));

        if let Ok(url) = Signal::url_matches("account url", r"(?i)/(dashboard|account|overview|inventory)") {
            heuristic = heuristic.signal(url);
        }
        heuristic
    }
}

// ============================================================================
// StateHeuristic - Evaluation
// ============================================================================

impl StateHeuristic {
    /// Evaluates every signal once and combines the results.
    ///
    /// Recoverable signal errors (stale or missing elements, driver
    /// timeouts) count as `false`. An empty heuristic never holds.
    ///
    /// # Errors
    ///
    /// Returns the first non-recoverable signal error.
    pub async fn evaluate(&self, session: &Session) -> Result<Judgment> {
        let mut fired = Vec::new();

        for signal in &self.signals {
            let result = match signal.observe(session).await {
                Ok(result) => result,
                Err(err) if err.is_recoverable() => {
                    warn!(heuristic = %self.name, signal = %signal.name, error = %err, "Signal failed, counting as false");
                    false
                }
                Err(err) => return Err(err),
            };
            if result {
                fired.push(signal.name.clone());
            }
        }

        let evaluated = self.signals.len();
        let holds = evaluated > 0
            && match self.combine {
                Combine::Any => !fired.is_empty(),
                Combine::All => fired.len() == evaluated,
            };

        let judgment = Judgment {
            holds,
            fired,
            evaluated,
        };
        debug!(heuristic = %self.name, judgment = %judgment, "Evaluated heuristic");
        Ok(judgment)
    }

    /// Waits for the document to finish loading, then evaluates.
    pub async fn evaluate_when_ready(&self, session: &Session) -> Result<Judgment> {
        session
            .wait("document ready")
            .until(|| conditions::document_ready(session))
            .await?;
        self.evaluate(session).await
    }

    /// Waits until the heuristic holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] naming the heuristic.
    pub async fn await_holds(&self, session: &Session) -> Result<Judgment> {
        session
            .wait(format!("state({})", self.name))
            .until_some(|| async move {
                let judgment = self.evaluate(session).await?;
                Ok(judgment.holds.then_some(judgment))
            })
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::sim::{SimBrowser, SimNode};

    fn session_at(url: &str, nodes: Vec<SimNode>) -> Session {
        let browser = SimBrowser::new();
        browser.page(url, nodes);
        browser.open(url);
        Session::new(browser)
    }

    #[test]
    fn test_plain_evaluate_is_or() {
        let signals: [fn() -> bool; 2] = [|| false, || true];
        assert!(evaluate(signals));

        let signals: [fn() -> bool; 1] = [|| false];
        assert!(!evaluate(signals));

        assert!(!evaluate(Vec::<fn() -> bool>::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_fires_on_single_signal() {
        let session = session_at("https://example.test/", vec![]);
        let heuristic = StateHeuristic::new("custom")
            .signal(Signal::custom("no", || false))
            .signal(Signal::custom("yes", || true));

        let judgment = heuristic.evaluate(&session).await.unwrap();
        assert!(judgment.holds);
        assert_eq!(judgment.fired, vec!["yes".to_string()]);
        assert_eq!(judgment.evaluated, 2);

        let none = StateHeuristic::new("none").signal(Signal::custom("no", || false));
        assert!(!none.evaluate(&session).await.unwrap().holds);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_requires_every_signal() {
        let session = session_at("https://example.test/inventory.html", vec![]);
        let heuristic = StateHeuristic::new("strict")
            .combine(Combine::All)
            .signal(Signal::url_contains("inventory url", "inventory"))
            .signal(Signal::present("items", LocatorSpec::new(By::class("inventory_item"))));

        let judgment = heuristic.evaluate(&session).await.unwrap();
        assert!(!judgment.holds);
        assert_eq!(judgment.fired, vec!["inventory url".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_heuristic_never_holds() {
        let session = session_at("https://example.test/", vec![]);
        for combine in [Combine::Any, Combine::All] {
            let heuristic = StateHeuristic::new("empty").combine(combine);
            assert!(!heuristic.evaluate(&session).await.unwrap().holds);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_in_by_link_text() {
        let session = session_at(
            "https://example.test/index.htm",
            vec![SimNode::new("a").attr("href", "/logout").text("Log out")],
        );
        let judgment = StateHeuristic::logged_in()
            .evaluate_when_ready(&session)
            .await
            .unwrap();
        assert!(judgment.holds);
        assert_eq!(judgment.fired, vec!["logout link".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_in_by_url_only() {
        let session = session_at("https://example.test/overview.htm", vec![]);
        let judgment = StateHeuristic::logged_in().evaluate(&session).await.unwrap();
        assert!(judgment.holds);
        assert_eq!(judgment.fired, vec!["account url".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_out_page() {
        let session = session_at(
            "https://example.test/",
            vec![SimNode::new("input").name("username")],
        );
        assert!(!StateHeuristic::logged_in().evaluate(&session).await.unwrap().holds);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_and_title_signals() {
        let browser = SimBrowser::new();
        browser.titled_page(
            "https://example.test/",
            "Swag Labs",
            vec![
                SimNode::new("div").class("inventory_item"),
                SimNode::new("div").class("inventory_item"),
            ],
        );
        browser.open("https://example.test/");
        let session = Session::new(browser);

        let items = LocatorSpec::new(By::class("inventory_item"));
        assert!(Signal::count_at_least("two", items.clone(), 2).observe(&session).await.unwrap());
        assert!(!Signal::count_at_least("three", items, 3).observe(&session).await.unwrap());
        assert!(Signal::title_contains("title", "Swag").observe(&session).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_signal() {
        let session = session_at(
            "https://example.test/",
            vec![SimNode::new("span").class("shopping_cart_badge").text("2")],
        );
        let badge = Signal::probe("cart badge", |session| {
            Box::pin(async move {
                let spec = LocatorSpec::new(By::class("shopping_cart_badge"));
                Ok(match session.resolve(&spec).await? {
                    Some(el) => session.text(&el).await? != "0",
                    None => false,
                })
            })
        });
        assert!(badge.observe(&session).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_holds_tracks_late_marker() {
        let session = session_at(
            "https://example.test/",
            vec![SimNode::new("div").id("accountSummary").appear_after(Duration::from_secs(1))],
        );
        let judgment = StateHeuristic::logged_in().await_holds(&session).await.unwrap();
        assert_eq!(judgment.fired, vec!["account summary".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_signal_reads_shared_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&flag);
        let heuristic =
            StateHeuristic::new("flag").signal(Signal::custom("flag", move || seen.load(Ordering::SeqCst)));
        let session = session_at("https://example.test/", vec![]);

        assert!(!heuristic.evaluate(&session).await.unwrap().holds);
        flag.store(true, Ordering::SeqCst);
        assert!(heuristic.evaluate(&session).await.unwrap().holds);
    }

    #[test]
    fn test_invalid_url_pattern() {
        assert!(Signal::url_matches("bad", "(unclosed").is_err());
    }
}
