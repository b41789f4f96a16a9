//! Query evaluation for every [`By`] dialect.
//!
//! CSS supports compound steps (`tag#id.class[attr]`, `[attr='v']`,
//! `[attr*='v']`, `[attr^='v']`, `[attr$='v']`) joined by descendant or
//! child (`>`) combinators. XPath supports `//tag` with one predicate:
//! `@attr='v'`, `text()='v'`, `contains(text(),'v')` or
//! `contains(@attr,'v')`.

use std::sync::LazyLock;

use regex::Regex;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::locator::By;

use super::dom::Document;

static CSS_STEP: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^(\*|[A-Za-z][\w-]*)?((?:#[\w-]+|\.[\w-]+|\[[\w-]+(?:[*^$]?=(?:'[^']*'|"[^"]*"|[^\]'"]*))?\])*)$"#)
        .ok()
});

static CSS_PART: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"#([\w-]+)|\.([\w-]+)|\[([\w-]+)(?:([*^$]?=)(?:'([^']*)'|"([^"]*)"|([^\]'"]*)))?\]"#)
        .ok()
});

static XPATH: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^//(\*|[A-Za-z][\w-]*)(?:\[(.+)\])?$")
        .ok()
});

static XPATH_PREDICATE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^(?:@([\w-]+)\s*=\s*['"]([^'"]*)['"]|text\(\)\s*=\s*['"]([^'"]*)['"]|contains\(\s*(text\(\)|@[\w-]+)\s*,\s*['"]([^'"]*)['"]\s*\))$"#)
        .ok()
});

// ============================================================================
// Selector Model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists(String),
    Eq(String, String),
    Contains(String, String),
    StartsWith(String, String),
    EndsWith(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Step {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextCondition {
    Equals(String),
    Contains(String),
}

/// Which text a text condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSource {
    /// The node's own text (`text()`).
    Own,
    /// Text of the whole subtree (`textContent`).
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    /// Steps left to right; the combinator joins a step to the previous one.
    Css(Vec<(Combinator, Step)>),
    Step(Step),
    Text {
        tag: Option<String>,
        condition: TextCondition,
        source: TextSource,
        /// Skip nodes whose child also satisfies the condition.
        innermost: bool,
    },
}

// ============================================================================
// Query
// ============================================================================

/// Returns attached matches of `by` in document order, below `root` when given.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a query outside the supported subset.
pub(crate) fn query(
    doc: &Document,
    root: Option<usize>,
    by: &By,
    now: Instant,
) -> Result<Vec<usize>> {
    let matcher = compile(by)?;
    Ok((0..doc.nodes.len())
        .filter(|&i| root.is_none_or(|r| doc.is_descendant(i, r)))
        .filter(|&i| doc.attached(i, now))
        .filter(|&i| matcher.matches(doc, i, now))
        .collect())
}

fn compile(by: &By) -> Result<Matcher> {
    let attr = |name: &str, value: &str| {
        Matcher::Step(Step {
            attrs: vec![AttrCondition::Eq(name.to_string(), value.to_string())],
            ..Step::default()
        })
    };

    Ok(match by {
        By::Css(selector) => parse_css(selector)?,
        By::XPath(expr) => parse_xpath(expr)?,
        By::Id(id) => attr("id", id),
        By::Name(name) => attr("name", name),
        By::Attr { name, value } => attr(name, value),
        By::Class(class) => Matcher::Step(Step {
            classes: vec![class.clone()],
            ..Step::default()
        }),
        By::Tag(tag) => Matcher::Step(Step {
            tag: Some(tag.to_ascii_lowercase()),
            ..Step::default()
        }),
        By::Text(text) => Matcher::Text {
            tag: None,
            condition: TextCondition::Equals(text.trim().to_string()),
            source: TextSource::Content,
            innermost: true,
        },
        By::PartialText(text) => Matcher::Text {
            tag: None,
            condition: TextCondition::Contains(text.clone()),
            source: TextSource::Content,
            innermost: true,
        },
        By::LinkText(text) => Matcher::Text {
            tag: Some("a".to_string()),
            condition: TextCondition::Equals(text.trim().to_string()),
            source: TextSource::Content,
            innermost: false,
        },
        By::PartialLinkText(text) => Matcher::Text {
            tag: Some("a".to_string()),
            condition: TextCondition::Contains(text.clone()),
            source: TextSource::Content,
            innermost: false,
        },
    })
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_css(selector: &str) -> Result<Matcher> {
    let invalid = || Error::invalid_argument(format!("unsupported css selector: {selector}"));

    let mut steps = Vec::new();
    let mut combinator = Combinator::Descendant;

    for token in tokenize_css(selector) {
        if token == ">" {
            if steps.is_empty() || combinator == Combinator::Child {
                return Err(invalid());
            }
            combinator = Combinator::Child;
            continue;
        }
        steps.push((combinator, parse_step(&token).ok_or_else(invalid)?));
        combinator = Combinator::Descendant;
    }

    if steps.is_empty() || combinator == Combinator::Child {
        return Err(invalid());
    }
    Ok(Matcher::Css(steps))
}

/// Splits on whitespace and `>` outside attribute brackets.
fn tokenize_css(selector: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in selector.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '>' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_step(token: &str) -> Option<Step> {
    let caps = CSS_STEP.as_ref()?.captures(token)?;
    let mut step = Step {
        tag: caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|t| *t != "*")
            .map(str::to_ascii_lowercase),
        ..Step::default()
    };

    let rest = caps.get(2).map_or("", |m| m.as_str());
    for part in CSS_PART.as_ref()?.captures_iter(rest) {
        if let Some(id) = part.get(1) {
            step.id = Some(id.as_str().to_string());
        } else if let Some(class) = part.get(2) {
            step.classes.push(class.as_str().to_string());
        } else if let Some(name) = part.get(3) {
            let name = name.as_str().to_string();
            let value = part
                .get(5)
                .or_else(|| part.get(6))
                .or_else(|| part.get(7))
                .map(|m| m.as_str().trim().to_string());
            let condition = match (part.get(4).map(|m| m.as_str()), value) {
                (None, _) | (_, None) => AttrCondition::Exists(name),
                (Some("*="), Some(v)) => AttrCondition::Contains(name, v),
                (Some("^="), Some(v)) => AttrCondition::StartsWith(name, v),
                (Some("$="), Some(v)) => AttrCondition::EndsWith(name, v),
                (Some(_), Some(v)) => AttrCondition::Eq(name, v),
            };
            step.attrs.push(condition);
        }
    }

    let empty = step.tag.is_none()
        && step.id.is_none()
        && step.classes.is_empty()
        && step.attrs.is_empty();
    (!empty || token == "*").then_some(step)
}

fn parse_xpath(expr: &str) -> Result<Matcher> {
    let invalid = || Error::invalid_argument(format!("unsupported xpath: {expr}"));

    let caps = XPATH
        .as_ref()
        .and_then(|re| re.captures(expr.trim()))
        .ok_or_else(invalid)?;
    let tag = caps
        .get(1)
        .map(|m| m.as_str())
        .filter(|t| *t != "*")
        .map(str::to_ascii_lowercase);

    let Some(predicate) = caps.get(2) else {
        return Ok(Matcher::Step(Step {
            tag,
            ..Step::default()
        }));
    };

    let pred = XPATH_PREDICATE
        .as_ref()
        .and_then(|re| re.captures(predicate.as_str().trim()))
        .ok_or_else(invalid)?;

    if let (Some(name), Some(value)) = (pred.get(1), pred.get(2)) {
        return Ok(Matcher::Step(Step {
            tag,
            attrs: vec![AttrCondition::Eq(
                name.as_str().to_string(),
                value.as_str().to_string(),
            )],
            ..Step::default()
        }));
    }
    if let Some(text) = pred.get(3) {
        return Ok(Matcher::Text {
            tag,
            condition: TextCondition::Equals(text.as_str().to_string()),
            source: TextSource::Own,
            innermost: false,
        });
    }

    let (Some(subject), Some(value)) = (pred.get(4), pred.get(5)) else {
        return Err(invalid());
    };
    let value = value.as_str().to_string();
    Ok(match subject.as_str().strip_prefix('@') {
        Some(name) => Matcher::Step(Step {
            tag,
            attrs: vec![AttrCondition::Contains(name.to_string(), value)],
            ..Step::default()
        }),
        None => Matcher::Text {
            tag,
            condition: TextCondition::Contains(value),
            source: TextSource::Own,
            innermost: false,
        },
    })
}

// ============================================================================
// Matching
// ============================================================================

impl Matcher {
    fn matches(&self, doc: &Document, index: usize, now: Instant) -> bool {
        match self {
            Self::Step(step) => step.matches(doc, index),
            Self::Css(steps) => matches_chain(doc, index, steps),
            Self::Text {
                tag,
                condition,
                source,
                innermost,
            } => {
                if tag.as_deref().is_some_and(|t| doc.nodes[index].tag != t) {
                    return false;
                }
                let text = match source {
                    TextSource::Own => doc.nodes[index].text.clone(),
                    TextSource::Content => doc.text_content(index, now),
                };
                if !condition.holds(&text) {
                    return false;
                }
                !*innermost
                    || !doc
                        .children(index, now)
                        .into_iter()
                        .any(|child| condition.holds(&doc.text_content(child, now)))
            }
        }
    }
}

impl TextCondition {
    fn holds(&self, text: &str) -> bool {
        match self {
            Self::Equals(expected) => text.trim() == expected,
            Self::Contains(fragment) => text.contains(fragment.as_str()),
        }
    }
}

impl Step {
    fn matches(&self, doc: &Document, index: usize) -> bool {
        let node = &doc.nodes[index];
        self.tag.as_deref().is_none_or(|t| node.tag == t)
            && self.id.as_deref().is_none_or(|id| node.attr("id") == Some(id))
            && self.classes.iter().all(|c| node.has_class(c))
            && self.attrs.iter().all(|condition| {
                let value = match condition {
                    AttrCondition::Exists(name)
                    | AttrCondition::Eq(name, _)
                    | AttrCondition::Contains(name, _)
                    | AttrCondition::StartsWith(name, _)
                    | AttrCondition::EndsWith(name, _) => node.attr(name),
                };
                match (condition, value) {
                    (_, None) => false,
                    (AttrCondition::Exists(_), Some(_)) => true,
                    (AttrCondition::Eq(_, v), Some(actual)) => actual == v,
                    (AttrCondition::Contains(_, v), Some(actual)) => actual.contains(v.as_str()),
                    (AttrCondition::StartsWith(_, v), Some(actual)) => actual.starts_with(v.as_str()),
                    (AttrCondition::EndsWith(_, v), Some(actual)) => actual.ends_with(v.as_str()),
                }
            })
    }
}

/// Matches the last step at `index`, then earlier steps against ancestors.
fn matches_chain(doc: &Document, index: usize, steps: &[(Combinator, Step)]) -> bool {
    let Some(((combinator, last), earlier)) = steps.split_last() else {
        return false;
    };
    if !last.matches(doc, index) {
        return false;
    }
    if earlier.is_empty() {
        return true;
    }

    let mut parent = doc.nodes[index].parent;
    while let Some(candidate) = parent {
        if matches_chain(doc, candidate, earlier) {
            return true;
        }
        if *combinator == Combinator::Child {
            return false;
        }
        parent = doc.nodes[candidate].parent;
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimNode;

    fn page() -> Document {
        Document::load(
            1,
            "",
            &[
                SimNode::new("form")
                    .id("login")
                    .child(SimNode::new("input").attr("type", "email").name("user-name"))
                    .child(
                        SimNode::new("div")
                            .class("row")
                            .child(SimNode::new("button").class("btn").class("primary").text("Sign in")),
                    ),
                SimNode::new("ul").child(SimNode::new("li").child(SimNode::new("a").text("Logout"))),
            ],
            Instant::now(),
        )
    }

    fn tags(doc: &Document, by: By) -> Vec<String> {
        query(doc, None, &by, Instant::now())
            .unwrap()
            .into_iter()
            .map(|i| doc.nodes[i].tag.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_css_compound_and_combinators() {
        let doc = page();
        assert_eq!(tags(&doc, By::css("button.btn.primary")), ["button"]);
        assert_eq!(tags(&doc, By::css("#login input[type='email']")), ["input"]);
        assert_eq!(tags(&doc, By::css("form > .row > button")), ["button"]);
        assert!(tags(&doc, By::css("form > button")).is_empty());
        assert_eq!(tags(&doc, By::css("[name^=user]")), ["input"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_xpath_subset() {
        let doc = page();
        assert_eq!(tags(&doc, By::xpath("//input[@type='email']")), ["input"]);
        assert_eq!(tags(&doc, By::xpath("//a[text()='Logout']")), ["a"]);
        assert_eq!(tags(&doc, By::xpath("//*[contains(text(),'Sign')]")), ["button"]);
        assert_eq!(tags(&doc, By::xpath("//input[contains(@name,'user')]")), ["input"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_matches_innermost_only() {
        let doc = page();
        assert_eq!(tags(&doc, By::text("Logout")), ["a"]);
        assert_eq!(tags(&doc, By::link_text("Logout")), ["a"]);
        assert_eq!(tags(&doc, By::partial_link_text("Log")), ["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_queries_rejected() {
        let doc = page();
        for by in [By::xpath("((broken"), By::css("div >"), By::css("a[href"), By::css("")] {
            let err = query(&doc, None, &by, Instant::now()).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }), "{by}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scoped_query() {
        let doc = page();
        let form = query(&doc, None, &By::id("login"), Instant::now()).unwrap()[0];
        let inside = query(&doc, Some(form), &By::tag("a"), Instant::now()).unwrap();
        assert!(inside.is_empty());
    }
}
