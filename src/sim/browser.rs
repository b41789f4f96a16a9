//! In-memory browser implementing [`UiDriver`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::time::Instant;
use tracing::trace;
use url::Url;
use uuid::Uuid;

use crate::driver::{ScriptArg, UiDriver};
use crate::error::{Error, Result};
use crate::identifiers::{ElementId, WindowHandle};
use crate::locator::By;

use super::dom::{ClickEffect, Document, SimNode};
use super::query;

/// URL of a context that has not started loading.
const BLANK_URL: &str = "about:blank";

// ============================================================================
// Internal State
// ============================================================================

#[derive(Debug, Clone)]
struct Page {
    title: String,
    nodes: Vec<SimNode>,
}

#[derive(Debug)]
struct Window {
    handle: WindowHandle,
    url: String,
    history: Vec<String>,
    doc: Document,
}

#[derive(Debug)]
struct Pending {
    due: Instant,
    window: WindowHandle,
    effect: Effect,
}

#[derive(Debug)]
enum Effect {
    Navigate { url: String, replace: bool },
    Open { url: String, blank_for: std::time::Duration },
    Render { page: String },
}

#[derive(Debug, Default)]
struct State {
    pages: FxHashMap<String, Page>,
    windows: Vec<Window>,
    focused: Option<WindowHandle>,
    pending: Vec<Pending>,
    generation: u64,
}

// ============================================================================
// SimBrowser
// ============================================================================

/// Deterministic stand-in for the target application and its browser.
///
/// Pages are registered per URL as trees of [`SimNode`]. Unknown URLs
/// render an empty body. Delays are measured on the tokio clock, so tests
/// running with paused time control every asynchronous effect.
///
/// Clones share the same state.
///
/// # Example
///
/// ```ignore
/// let browser = SimBrowser::new();
/// browser.page("https://shop.test/", vec![
///     SimNode::new("a").class("social_twitter")
///         .on_click(ClickEffect::open_window("https://twitter.com/shop")),
/// ]);
/// browser.open("https://shop.test/");
///
/// let session = Session::new(browser.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimBrowser {
    state: Arc<Mutex<State>>,
}

impl SimBrowser {
    /// Creates a browser with no pages and no windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the page served at `url` (or under a render key).
    pub fn page(&self, url: impl Into<String>, nodes: Vec<SimNode>) {
        self.titled_page(url, "", nodes);
    }

    /// Registers a page with a document title.
    pub fn titled_page(&self, url: impl Into<String>, title: impl Into<String>, nodes: Vec<SimNode>) {
        self.state.lock().pages.insert(
            url.into(),
            Page {
                title: title.into(),
                nodes,
            },
        );
    }

    /// Opens a new window on `url` and focuses it.
    pub fn open(&self, url: &str) -> WindowHandle {
        let now = Instant::now();
        let mut state = self.state.lock();
        let handle = state.create_window(now);
        state.navigate(&handle, url, true, now);
        state.focused = Some(handle.clone());
        handle
    }

    /// Returns the number of open windows.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.state.lock().windows.len()
    }

    /// Runs `f` on the state after applying every effect that is due.
    fn with_state<T>(&self, f: impl FnOnce(&mut State, Instant) -> Result<T>) -> Result<T> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.advance(now);
        f(&mut state, now)
    }
}

// ============================================================================
// State - Windows
// ============================================================================

impl State {
    fn create_window(&mut self, now: Instant) -> WindowHandle {
        let handle = WindowHandle::new(Uuid::new_v4().to_string());
        let doc = self.render(BLANK_URL, now);
        self.windows.push(Window {
            handle: handle.clone(),
            url: BLANK_URL.to_string(),
            history: vec![BLANK_URL.to_string()],
            doc,
        });
        handle
    }

    fn window_mut(&mut self, handle: &WindowHandle) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| &w.handle == handle)
    }

    fn focused(&self) -> Result<&Window> {
        let handle = self.focused.as_ref().ok_or_else(Error::no_focused_window)?;
        self.windows
            .iter()
            .find(|w| &w.handle == handle)
            .ok_or_else(|| Error::no_such_window(handle))
    }

    fn focused_mut(&mut self) -> Result<&mut Window> {
        let handle = self.focused.clone().ok_or_else(Error::no_focused_window)?;
        self.window_mut(&handle)
            .ok_or_else(|| Error::no_such_window(&handle))
    }

    fn render(&mut self, key: &str, now: Instant) -> Document {
        self.generation += 1;
        match self.pages.get(key) {
            Some(page) => Document::load(self.generation, &page.title, &page.nodes, now),
            None => Document::load(self.generation, "", &[], now),
        }
    }

    fn navigate(&mut self, handle: &WindowHandle, url: &str, replace: bool, now: Instant) {
        let doc = self.render(url, now);
        let Some(window) = self.window_mut(handle) else {
            return;
        };
        if replace {
            window.history.pop();
        }
        window.history.push(url.to_string());
        window.url = url.to_string();
        window.doc = doc;
        trace!(window = %handle, url = %url, replace, "Sim navigation");
    }

    fn back(&mut self, now: Instant) -> Result<()> {
        let window = self.focused()?;
        if window.history.len() < 2 {
            return Ok(());
        }
        let handle = window.handle.clone();
        let previous = window.history[window.history.len() - 2].clone();
        let doc = self.render(&previous, now);

        let window = self.focused_mut()?;
        window.history.pop();
        window.url = previous;
        window.doc = doc;
        trace!(window = %handle, url = %window.url, "Sim back");
        Ok(())
    }
}

// ============================================================================
// State - Effects
// ============================================================================

impl State {
    /// Applies every pending effect due at or before `now`, in due order.
    fn advance(&mut self, now: Instant) {
        loop {
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, p)| p.due <= now)
                .min_by_key(|(_, p)| p.due)
                .map(|(i, _)| i);
            let Some(index) = next else {
                break;
            };
            let pending = self.pending.swap_remove(index);
            self.apply(pending.window, pending.effect, pending.due);
        }
    }

    fn schedule(&mut self, window: WindowHandle, effect: Effect, due: Instant, now: Instant) {
        if due <= now {
            self.apply(window, effect, now);
        } else {
            self.pending.push(Pending {
                due,
                window,
                effect,
            });
        }
    }

    fn apply(&mut self, window: WindowHandle, effect: Effect, at: Instant) {
        if !self.windows.iter().any(|w| w.handle == window) {
            return;
        }
        match effect {
            Effect::Navigate { url, replace } => self.navigate(&window, &url, replace, at),
            Effect::Open { url, blank_for } => {
                let opened = self.create_window(at);
                trace!(opener = %window, window = %opened, url = %url, "Sim window opened");
                self.schedule(
                    opened,
                    Effect::Navigate { url, replace: true },
                    at + blank_for,
                    at,
                );
            }
            Effect::Render { page } => {
                let doc = self.render(&page, at);
                if let Some(w) = self.window_mut(&window) {
                    w.doc = doc;
                }
            }
        }
    }
}

// ============================================================================
// State - Elements
// ============================================================================

impl State {
    /// Maps an element reference to its node in the focused document.
    fn element(&self, id: &ElementId, now: Instant) -> Result<usize> {
        let doc = &self.focused()?.doc;
        let index = id
            .as_str()
            .strip_prefix(&format!("sim-{}-", doc.generation))
            .and_then(|i| i.parse::<usize>().ok())
            .filter(|&i| i < doc.nodes.len() && doc.attached(i, now));
        index.ok_or_else(|| Error::stale_element(id.clone()))
    }

    fn element_id(doc: &Document, index: usize) -> ElementId {
        ElementId::new(format!("sim-{}-{index}", doc.generation))
    }

    /// Runs the node's activation behaviour.
    fn activate(&mut self, index: usize, now: Instant) -> Result<()> {
        let window = self.focused()?;
        let handle = window.handle.clone();
        let doc = &window.doc;
        let node = &doc.nodes[index];

        if node.disabled {
            return Ok(());
        }

        let effect = match &node.on_click {
            Some(effect) => Some(effect.clone()),
            None if node.tag == "a" => link_effect(&window.url, node.attr("href"), node.attr("target")),
            None => None,
        };

        if node.tag == "option"
            && let Some(select) = doc.enclosing_select(index)
        {
            let value = doc.option_value(index);
            self.focused_mut()?.doc.nodes[select].value = value;
        }

        let Some(effect) = effect else {
            return Ok(());
        };

        let due = now + effect.delay();
        let effect = match effect {
            ClickEffect::Navigate { url, replace, .. } => Effect::Navigate { url, replace },
            ClickEffect::OpenWindow { url, blank_for, .. } => Effect::Open { url, blank_for },
            ClickEffect::Render { page, .. } => Effect::Render { page },
        };
        self.schedule(handle, effect, due, now);
        Ok(())
    }
}

/// Default behaviour of `<a href>`.
fn link_effect(base: &str, href: Option<&str>, target: Option<&str>) -> Option<ClickEffect> {
    let href = href?;
    let url = Url::parse(base)
        .and_then(|b| b.join(href))
        .map_or_else(|_| href.to_string(), String::from);
    Some(match target {
        Some("_blank") => ClickEffect::open_window(url),
        _ => ClickEffect::navigate(url),
    })
}

fn element_arg(args: &[ScriptArg]) -> Result<&ElementId> {
    match args.first() {
        Some(ScriptArg::Element(id)) => Ok(id),
        _ => Err(Error::script_error("arguments[0] is not an element")),
    }
}

// ============================================================================
// UiDriver
// ============================================================================

#[async_trait]
impl UiDriver for SimBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.with_state(|state, now| {
            let handle = state.focused()?.handle.clone();
            state.navigate(&handle, url, false, now);
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.with_state(|state, _| Ok(state.focused()?.url.clone()))
    }

    async fn title(&self) -> Result<String> {
        self.with_state(|state, _| Ok(state.focused()?.doc.title.clone()))
    }

    async fn back(&self) -> Result<()> {
        self.with_state(|state, now| state.back(now))
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        self.with_state(|state, _| Ok(state.windows.iter().map(|w| w.handle.clone()).collect()))
    }

    async fn focused_handle(&self) -> Result<WindowHandle> {
        self.with_state(|state, _| Ok(state.focused()?.handle.clone()))
    }

    async fn switch_to(&self, handle: &WindowHandle) -> Result<()> {
        self.with_state(|state, _| {
            if !state.windows.iter().any(|w| &w.handle == handle) {
                return Err(Error::no_such_window(handle));
            }
            state.focused = Some(handle.clone());
            Ok(())
        })
    }

    async fn close(&self, handle: &WindowHandle) -> Result<()> {
        self.with_state(|state, _| {
            let Some(position) = state.windows.iter().position(|w| &w.handle == handle) else {
                return Err(Error::no_such_window(handle));
            };
            state.windows.remove(position);
            if state.focused.as_ref() == Some(handle) {
                state.focused = None;
            }
            Ok(())
        })
    }

    async fn query(&self, root: Option<&ElementId>, by: &By) -> Result<Vec<ElementId>> {
        self.with_state(|state, now| {
            let root = root.map(|id| state.element(id, now)).transpose()?;
            let doc = &state.focused()?.doc;
            let matches = query::query(doc, root, by, now)?;
            Ok(matches
                .into_iter()
                .map(|i| State::element_id(doc, i))
                .collect())
        })
    }

    async fn attribute(&self, element: &ElementId, name: &str) -> Result<Option<String>> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            let node = &state.focused()?.doc.nodes[index];
            Ok(match name {
                "value" => Some(node.value.clone()),
                _ => node.attr(name).map(str::to_string),
            })
        })
    }

    async fn text(&self, element: &ElementId) -> Result<String> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            let doc = &state.focused()?.doc;
            Ok(if doc.displayed(index, now) {
                doc.text_content(index, now)
            } else {
                String::new()
            })
        })
    }

    async fn value(&self, element: &ElementId) -> Result<String> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            Ok(state.focused()?.doc.nodes[index].value.clone())
        })
    }

    async fn is_displayed(&self, element: &ElementId) -> Result<bool> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            Ok(state.focused()?.doc.displayed(index, now))
        })
    }

    async fn is_enabled(&self, element: &ElementId) -> Result<bool> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            Ok(!state.focused()?.doc.nodes[index].disabled)
        })
    }

    async fn click(&self, element: &ElementId) -> Result<()> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            let doc = &state.focused()?.doc;
            if !doc.displayed(index, now) {
                return Err(Error::driver(format!("element {element} is not interactable")));
            }
            if let Some(overlay) = &doc.nodes[index].obstruction {
                return Err(Error::click_intercepted(element.clone(), overlay.clone()));
            }
            state.activate(index, now)
        })
    }

    async fn clear(&self, element: &ElementId) -> Result<()> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            state.focused_mut()?.doc.nodes[index].value.clear();
            Ok(())
        })
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()> {
        self.with_state(|state, now| {
            let index = state.element(element, now)?;
            let node = &mut state.focused_mut()?.doc.nodes[index];
            if node.disabled {
                return Err(Error::driver(format!("element {element} is disabled")));
            }
            node.value = match node.mask {
                Some(mask) => mask.apply(&node.value, text),
                None => format!("{}{text}", node.value),
            };
            Ok(())
        })
    }

    async fn execute_in_page(&self, script: &str, args: &[ScriptArg]) -> Result<Value> {
        self.with_state(|state, now| {
            if script.contains("document.readyState") {
                state.focused()?;
                return Ok(Value::from("complete"));
            }
            if script.contains("document.title") {
                return Ok(Value::from(state.focused()?.doc.title.clone()));
            }
            if script.contains("scrollIntoView") {
                state.element(element_arg(args)?, now)?;
                return Ok(Value::Null);
            }
            if script.contains(".click()") {
                let index = state.element(element_arg(args)?, now)?;
                if state.focused()?.doc.nodes[index].rejects_scripts {
                    return Err(Error::script_error("click() blocked by page handler"));
                }
                state.activate(index, now)?;
                return Ok(Value::Null);
            }
            Err(Error::script_error(format!("unsupported script: {script}")))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const HOME: &str = "https://example.test/";

    fn browser() -> SimBrowser {
        let browser = SimBrowser::new();
        browser.titled_page(
            HOME,
            "Home",
            vec![
                SimNode::new("a").id("about").attr("href", "/about"),
                SimNode::new("a")
                    .id("ext")
                    .attr("href", "https://twitter.com/example")
                    .attr("target", "_blank"),
                SimNode::new("button")
                    .id("sort")
                    .on_click(ClickEffect::render("sorted").delayed(Duration::from_millis(500))),
            ],
        );
        browser.page("sorted", vec![SimNode::new("li").text("sorted")]);
        browser.open(HOME);
        browser
    }

    async fn first(browser: &SimBrowser, by: By) -> ElementId {
        browser.query(None, &by).await.unwrap().remove(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_relative_link_and_back() {
        let browser = browser();
        let about = first(&browser, By::id("about")).await;

        browser.click(&about).await.unwrap();
        assert_eq!(browser.current_url().await.unwrap(), "https://example.test/about");

        let err = browser.text(&about).await.unwrap_err();
        assert!(matches!(err, Error::StaleElement { .. }));

        browser.back().await.unwrap();
        assert_eq!(browser.current_url().await.unwrap(), HOME);
        assert_eq!(browser.title().await.unwrap(), "Home");
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_blank_opens_window() {
        let browser = browser();
        let ext = first(&browser, By::id("ext")).await;
        let origin = browser.focused_handle().await.unwrap();

        browser.click(&ext).await.unwrap();
        let handles = browser.window_handles().await.unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(browser.focused_handle().await.unwrap(), origin);

        browser.switch_to(&handles[1]).await.unwrap();
        assert_eq!(browser.current_url().await.unwrap(), "https://twitter.com/example");
    }

    #[tokio::test(start_paused = true)]
    async fn test_option_click_selects_then_runs_effect() {
        let browser = SimBrowser::new();
        browser.page(
            HOME,
            vec![
                SimNode::new("select")
                    .id("sort")
                    .child(SimNode::new("option").attr("value", "az").text("A to Z"))
                    .child(
                        SimNode::new("option")
                            .attr("value", "za")
                            .text("Z to A")
                            .on_click(ClickEffect::render("sorted").delayed(Duration::from_millis(500))),
                    ),
            ],
        );
        browser.page("sorted", vec![SimNode::new("li").text("sorted")]);
        browser.open(HOME);

        let select = first(&browser, By::id("sort")).await;
        assert_eq!(browser.value(&select).await.unwrap(), "az");

        let za = first(&browser, By::attr("value", "za")).await;
        browser.click(&za).await.unwrap();
        assert_eq!(browser.value(&select).await.unwrap(), "za");

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(!browser.query(None, &By::tag("li")).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_focused_window_leaves_no_focus() {
        let browser = browser();
        let handle = browser.focused_handle().await.unwrap();

        browser.close(&handle).await.unwrap();
        assert!(matches!(
            browser.focused_handle().await.unwrap_err(),
            Error::NoSuchWindow { .. }
        ));
        assert!(browser.close(&handle).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_render_keeps_url() {
        let browser = browser();
        let sort = first(&browser, By::id("sort")).await;

        browser.click(&sort).await.unwrap();
        assert!(browser.query(None, &By::tag("li")).await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(browser.query(None, &By::tag("li")).await.unwrap().len(), 1);
        assert_eq!(browser.current_url().await.unwrap(), HOME);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripts() {
        let browser = browser();
        let about = first(&browser, By::id("about")).await;

        let state = browser
            .execute_in_page("return document.readyState", &[])
            .await
            .unwrap();
        assert_eq!(state, "complete");

        let args = [ScriptArg::Element(about)];
        browser
            .execute_in_page("arguments[0].click();", &args)
            .await
            .unwrap();
        assert_eq!(browser.current_url().await.unwrap(), "https://example.test/about");

        let err = browser.execute_in_page("window.alert(1)", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ScriptError { .. }));
    }
}
