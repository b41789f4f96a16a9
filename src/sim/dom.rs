//! Page model: node builders and live documents.

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// InputMask
// ============================================================================

/// Client-side input filter applied to typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputMask {
    /// Drops every non-digit.
    DigitsOnly,
    /// Upper-cases letters.
    Uppercase,
    /// Stops accepting input past this many characters.
    MaxLength(usize),
}

impl InputMask {
    /// Returns the value after typing `typed` into a field holding `current`.
    #[must_use]
    pub fn apply(self, current: &str, typed: &str) -> String {
        match self {
            Self::DigitsOnly => {
                let mut value = current.to_string();
                value.extend(typed.chars().filter(char::is_ascii_digit));
                value
            }
            Self::Uppercase => format!("{current}{}", typed.to_uppercase()),
            Self::MaxLength(max) => current.chars().chain(typed.chars()).take(max).collect(),
        }
    }
}

// ============================================================================
// ClickEffect
// ============================================================================

/// What happens when a node is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// The focused context loads `url`.
    Navigate {
        /// Destination.
        url: String,
        /// Time before the navigation starts.
        delay: Duration,
        /// Replace the current history entry instead of pushing one.
        replace: bool,
    },
    /// A new context opens and loads `url`.
    OpenWindow {
        /// Destination.
        url: String,
        /// Time before the context appears.
        delay: Duration,
        /// Time the new context shows `about:blank` before loading.
        blank_for: Duration,
    },
    /// The document is re-rendered from another registered page while
    /// the URL stays the same.
    Render {
        /// Registered page key.
        page: String,
        /// Time before the re-render.
        delay: Duration,
    },
}

impl ClickEffect {
    /// Same-context navigation.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate {
            url: url.into(),
            delay: Duration::ZERO,
            replace: false,
        }
    }

    /// Same-context navigation that replaces the history entry.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::Navigate {
            url: url.into(),
            delay: Duration::ZERO,
            replace: true,
        }
    }

    /// New-context navigation.
    pub fn open_window(url: impl Into<String>) -> Self {
        Self::OpenWindow {
            url: url.into(),
            delay: Duration::ZERO,
            blank_for: Duration::ZERO,
        }
    }

    /// In-place re-render without a URL change.
    pub fn render(page: impl Into<String>) -> Self {
        Self::Render {
            page: page.into(),
            delay: Duration::ZERO,
        }
    }

    /// Sets the time before the effect starts.
    #[must_use]
    pub fn delayed(mut self, after: Duration) -> Self {
        match &mut self {
            Self::Navigate { delay, .. }
            | Self::OpenWindow { delay, .. }
            | Self::Render { delay, .. } => *delay = after,
        }
        self
    }

    /// Sets how long a new context stays on `about:blank`.
    ///
    /// No effect on other variants.
    #[must_use]
    pub fn blank_for(mut self, duration: Duration) -> Self {
        if let Self::OpenWindow { blank_for, .. } = &mut self {
            *blank_for = duration;
        }
        self
    }

    pub(crate) fn delay(&self) -> Duration {
        match self {
            Self::Navigate { delay, .. }
            | Self::OpenWindow { delay, .. }
            | Self::Render { delay, .. } => *delay,
        }
    }
}

// ============================================================================
// SimNode
// ============================================================================

/// Builder for one element of a simulated page.
///
/// # Example
///
/// ```ignore
/// SimNode::new("form")
///     .id("login")
///     .child(SimNode::new("input").attr("type", "email"))
///     .child(SimNode::new("button").text("Sign in").on_click(ClickEffect::navigate("/home")))
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimNode {
    pub(crate) tag: String,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) children: Vec<SimNode>,
    pub(crate) hidden: bool,
    pub(crate) disabled: bool,
    pub(crate) obstruction: Option<String>,
    pub(crate) rejects_scripts: bool,
    pub(crate) mask: Option<InputMask>,
    pub(crate) on_click: Option<ClickEffect>,
    pub(crate) appear_after: Option<Duration>,
}

impl SimNode {
    /// Creates an element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            hidden: false,
            disabled: false,
            obstruction: None,
            rejects_scripts: false,
            mask: None,
            on_click: None,
            appear_after: None,
        }
    }

    /// Sets an attribute, replacing an existing value.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
        self
    }

    /// Sets the `id` attribute.
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Sets the `name` attribute.
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.attr("name", name)
    }

    /// Adds a class.
    #[must_use]
    pub fn class(self, class: impl Into<String>) -> Self {
        let class = class.into();
        let joined = match self.attrs.iter().find(|(n, _)| n == "class") {
            Some((_, existing)) => format!("{existing} {class}"),
            None => class,
        };
        self.attr("class", joined)
    }

    /// Sets the initial form value.
    #[must_use]
    pub fn value(self, value: impl Into<String>) -> Self {
        self.attr("value", value)
    }

    /// Sets the node's own text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, child: SimNode) -> Self {
        self.children.push(child);
        self
    }

    /// Renders the node (and its subtree) invisible.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Makes the node refuse input.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self.attr("disabled", "")
    }

    /// Places an overlay over the node that receives direct clicks.
    #[must_use]
    pub fn obstructed_by(mut self, overlay: impl Into<String>) -> Self {
        self.obstruction = Some(overlay.into());
        self
    }

    /// Makes scripted clicks on this node fail.
    #[must_use]
    pub fn rejects_scripts(mut self) -> Self {
        self.rejects_scripts = true;
        self
    }

    /// Filters typed characters.
    #[must_use]
    pub fn mask(mut self, mask: InputMask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Sets the click effect.
    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = Some(effect);
        self
    }

    /// Inserts the node (and its subtree) only after the document has
    /// been loaded for `delay`.
    #[must_use]
    pub fn appear_after(mut self, delay: Duration) -> Self {
        self.appear_after = Some(delay);
        self
    }
}

// ============================================================================
// Document
// ============================================================================

/// One flattened element of a live document.
#[derive(Debug, Clone)]
pub(crate) struct DomNode {
    pub parent: Option<usize>,
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub value: String,
    pub hidden: bool,
    pub disabled: bool,
    pub obstruction: Option<String>,
    pub rejects_scripts: bool,
    pub mask: Option<InputMask>,
    pub on_click: Option<ClickEffect>,
    pub appears_at: Option<Instant>,
}

impl DomNode {
    fn element(tag: &str, parent: Option<usize>) -> Self {
        Self {
            parent,
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            value: String::new(),
            hidden: false,
            disabled: false,
            obstruction: None,
            rejects_scripts: false,
            mask: None,
            on_click: None,
            appears_at: None,
        }
    }

    /// Returns an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// A loaded page: elements in document order, `<body>` at index 0.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub generation: u64,
    pub title: String,
    pub nodes: Vec<DomNode>,
}

impl Document {
    /// Flattens `tree` under a fresh `<body>`.
    pub fn load(generation: u64, title: &str, tree: &[SimNode], now: Instant) -> Self {
        let mut nodes = vec![DomNode::element("body", None)];
        for node in tree {
            flatten(node, 0, now, &mut nodes);
        }

        let mut doc = Self {
            generation,
            title: title.to_string(),
            nodes,
        };
        doc.init_selects();
        doc
    }

    /// Returns `true` if `index` and all its ancestors have been inserted.
    pub fn attached(&self, index: usize, now: Instant) -> bool {
        self.chain(index)
            .all(|i| self.nodes[i].appears_at.is_none_or(|at| at <= now))
    }

    /// Returns `true` if the node is attached and nothing hides it.
    pub fn displayed(&self, index: usize, now: Instant) -> bool {
        self.attached(index, now) && self.chain(index).all(|i| !self.nodes[i].hidden)
    }

    /// Returns `true` if `index` lies strictly inside `ancestor`'s subtree.
    pub fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
        let mut current = self.nodes[index].parent;
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }

    /// Returns the indices of `index`'s attached element children.
    pub fn children(&self, index: usize, now: Instant) -> Vec<usize> {
        (index + 1..self.subtree_end(index))
            .filter(|&i| self.nodes[i].parent == Some(index) && self.attached(i, now))
            .collect()
    }

    /// Returns the rendered text of the subtree.
    pub fn text_content(&self, index: usize, now: Instant) -> String {
        let mut parts = Vec::new();
        for i in index..self.subtree_end(index) {
            let text = self.nodes[i].text.trim();
            if !text.is_empty() && self.attached(i, now) {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    /// Returns the nearest `<select>` ancestor.
    pub fn enclosing_select(&self, index: usize) -> Option<usize> {
        self.chain(index)
            .skip(1)
            .find(|&i| self.nodes[i].tag == "select")
    }

    /// Value an `<option>` submits.
    pub fn option_value(&self, index: usize) -> String {
        let node = &self.nodes[index];
        node.attr("value")
            .map_or_else(|| node.text.trim().to_string(), str::to_string)
    }

    /// `index` followed by its ancestors.
    fn chain(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(index), |&i| self.nodes[i].parent)
    }

    /// One past the last descendant of `index` in document order.
    fn subtree_end(&self, index: usize) -> usize {
        let mut end = index + 1;
        while end < self.nodes.len() && self.is_descendant(end, index) {
            end += 1;
        }
        end
    }

    fn init_selects(&mut self) {
        for select in 0..self.nodes.len() {
            if self.nodes[select].tag != "select" {
                continue;
            }
            let options: Vec<usize> = (select + 1..self.subtree_end(select))
                .filter(|&i| self.nodes[i].tag == "option")
                .collect();
            let chosen = options
                .iter()
                .copied()
                .find(|&i| self.nodes[i].attr("selected").is_some())
                .or_else(|| options.first().copied());
            if let Some(option) = chosen {
                self.nodes[select].value = self.option_value(option);
            }
        }
    }
}

fn flatten(node: &SimNode, parent: usize, loaded: Instant, out: &mut Vec<DomNode>) {
    let index = out.len();
    let mut dom = DomNode::element(&node.tag, Some(parent));
    dom.attrs = node.attrs.clone();
    dom.text = node.text.clone();
    dom.value = node.attrs
        .iter()
        .find(|(n, _)| n == "value")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    dom.hidden = node.hidden;
    dom.disabled = node.disabled;
    dom.obstruction = node.obstruction.clone();
    dom.rejects_scripts = node.rejects_scripts;
    dom.mask = node.mask;
    dom.on_click = node.on_click.clone();
    dom.appears_at = node.appear_after.map(|delay| loaded + delay);
    out.push(dom);

    for child in &node.children {
        flatten(child, index, loaded, out);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert_eq!(InputMask::DigitsOnly.apply("", "12ab3"), "123");
        assert_eq!(InputMask::Uppercase.apply("A", "bc"), "ABC");
        assert_eq!(InputMask::MaxLength(4).apply("12", "345"), "1234");
    }

    #[test]
    fn test_class_accumulates() {
        let node = SimNode::new("div").class("a").class("b");
        assert_eq!(node.attrs, vec![("class".to_string(), "a b".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flatten_order_and_text() {
        let now = Instant::now();
        let doc = Document::load(
            1,
            "",
            &[
                SimNode::new("ul")
                    .child(SimNode::new("li").text("one"))
                    .child(SimNode::new("li").text("two")),
                SimNode::new("p").text("after"),
            ],
            now,
        );

        let tags: Vec<_> = doc.nodes.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, ["body", "ul", "li", "li", "p"]);
        assert_eq!(doc.text_content(1, now), "one two");
        assert_eq!(doc.children(1, now), vec![2, 3]);
        assert!(doc.is_descendant(3, 0));
        assert!(!doc.is_descendant(4, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_subtree_attaches_later() {
        let now = Instant::now();
        let doc = Document::load(
            1,
            "",
            &[SimNode::new("div")
                .appear_after(Duration::from_secs(1))
                .child(SimNode::new("span").text("late"))],
            now,
        );

        assert!(!doc.attached(2, now));
        assert!(doc.attached(2, now + Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_starts_on_selected_option() {
        let doc = Document::load(
            1,
            "",
            &[SimNode::new("select")
                .child(SimNode::new("option").text("First"))
                .child(SimNode::new("option").attr("value", "b").attr("selected", ""))],
            Instant::now(),
        );
        assert_eq!(doc.nodes[1].value, "b");
        assert_eq!(doc.enclosing_select(2), Some(1));
    }
}
