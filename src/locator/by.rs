//! Element query candidates.
//!
//! Provides Selenium-like `By` selectors. Each variant belongs to one
//! query [`Dialect`]; the engine never interprets the query text itself,
//! it only hands it to the driver.
//!
//! # Example
//!
//! ```ignore
//! use resilient_driver::By;
//!
//! // Structural path
//! let btn = By::css("form button[type='submit']");
//! let row = By::xpath("//tr[@data-id='7']");
//!
//! // Attribute match
//! let email = By::id("email");
//! let field = By::attr("type", "email");
//!
//! // Visible text
//! let link = By::link_text("Logout");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Dialect
// ============================================================================

/// Query dialect a candidate is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    /// Document structure (CSS, XPath, tag, class).
    StructuralPath,
    /// Attribute equality (id, name, arbitrary attribute).
    AttributeMatch,
    /// Rendered text content.
    VisibleText,
}

// ============================================================================
// By Enum
// ============================================================================

/// One element query candidate (like Selenium's `By`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum By {
    /// CSS selector.
    ///
    /// # Example
    /// ```ignore
    /// By::Css("#login-button")
    /// By::Css("button.primary")
    /// ```
    #[serde(rename = "css")]
    Css(String),

    /// XPath expression.
    ///
    /// # Example
    /// ```ignore
    /// By::XPath("//button[@type='submit']")
    /// By::XPath("//a[text()='Login']")
    /// ```
    #[serde(rename = "xpath")]
    XPath(String),

    /// Exact text content match.
    ///
    /// Finds the innermost elements whose trimmed `textContent` equals
    /// `value`.
    #[serde(rename = "text")]
    Text(String),

    /// Partial text content match.
    ///
    /// Finds the innermost elements whose `textContent` contains `value`.
    #[serde(rename = "partialText")]
    PartialText(String),

    /// Element ID.
    #[serde(rename = "id")]
    Id(String),

    /// Tag name.
    #[serde(rename = "tag")]
    Tag(String),

    /// Name attribute.
    #[serde(rename = "name")]
    Name(String),

    /// Class name (single class).
    #[serde(rename = "class")]
    Class(String),

    /// Arbitrary attribute equality.
    ///
    /// # Example
    /// ```ignore
    /// By::attr("type", "email")        // [type='email']
    /// By::attr("data-test", "error")   // [data-test='error']
    /// ```
    #[serde(rename = "attr")]
    Attr {
        /// Attribute name.
        name: String,
        /// Expected attribute value.
        value: String,
    },

    /// Link text (for `<a>` elements).
    #[serde(rename = "linkText")]
    LinkText(String),

    /// Partial link text (for `<a>` elements).
    #[serde(rename = "partialLinkText")]
    PartialLinkText(String),
}

impl By {
    /// Creates a CSS selector.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an XPath selector.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates a text content selector.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a partial text content selector.
    #[inline]
    pub fn partial_text(text: impl Into<String>) -> Self {
        Self::PartialText(text.into())
    }

    /// Creates an ID selector.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates a tag name selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates a name attribute selector.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a class name selector.
    #[inline]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Creates an attribute equality selector.
    #[inline]
    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attr {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a link text selector.
    #[inline]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Creates a partial link text selector.
    #[inline]
    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::PartialLinkText(text.into())
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Text(_) => "text",
            Self::PartialText(_) => "partialText",
            Self::Id(_) => "id",
            Self::Tag(_) => "tag",
            Self::Name(_) => "name",
            Self::Class(_) => "class",
            Self::Attr { .. } => "attr",
            Self::LinkText(_) => "linkText",
            Self::PartialLinkText(_) => "partialLinkText",
        }
    }

    /// Returns the selector value.
    ///
    /// For [`By::Attr`] this is the expected attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v)
            | Self::XPath(v)
            | Self::Text(v)
            | Self::PartialText(v)
            | Self::Id(v)
            | Self::Tag(v)
            | Self::Name(v)
            | Self::Class(v)
            | Self::LinkText(v)
            | Self::PartialLinkText(v) => v,
            Self::Attr { value, .. } => value,
        }
    }

    /// Returns the query dialect of this candidate.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Css(_) | Self::XPath(_) | Self::Tag(_) | Self::Class(_) => {
                Dialect::StructuralPath
            }
            Self::Id(_) | Self::Name(_) | Self::Attr { .. } => Dialect::AttributeMatch,
            Self::Text(_) | Self::PartialText(_) | Self::LinkText(_) | Self::PartialLinkText(_) => {
                Dialect::VisibleText
            }
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attr { name, value } => write!(f, "attr:{name}={value}"),
            other => write!(f, "{}:{}", other.strategy(), other.value()),
        }
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: &str) -> Self {
        Self::Css(s.to_string())
    }
}

impl From<String> for By {
    /// Converts a string to CSS selector (default).
    fn from(s: String) -> Self {
        Self::Css(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
