//! Before/after comparison of ordered text values.
//!
//! A [`Snapshot`] captures the visible text of a list (product names,
//! prices) at one moment. [`diff`] compares two snapshots and reports
//! whether the list changed and whether the later one is ordered.
//!
//! # Example
//!
//! ```ignore
//! let prices = LocatorSpec::new(By::class("inventory_item_price"));
//!
//! let before = Snapshot::capture(&session, &prices).await?;
//! session.select_option(&sort, "Price (low to high)").await?;
//! let after = Snapshot::capture(&session, &prices).await?;
//!
//! match ordering::diff(&before, &after) {
//!     Verdict::Compared(d) => assert_eq!(d.monotonic, Some(SortOrder::Ascending)),
//!     Verdict::Insufficient { .. } => println!("list not rendered, skipping"),
//! }
//! ```

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::locator::LocatorSpec;
use crate::session::Session;

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable, ordered capture of text values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: Vec<String>,
}

impl Snapshot {
    /// Creates a snapshot from values.
    #[must_use]
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Captures the trimmed text of every match of `spec`'s winning
    /// candidate, in document order.
    ///
    /// No match yields an empty snapshot.
    pub async fn capture(session: &Session, spec: &LocatorSpec) -> Result<Self> {
        let mut values = Vec::new();
        if let Some(all) = session.resolve_all(spec).await? {
            for element in &all.elements {
                values.push(session.text(element).await?.trim().to_string());
            }
        }
        debug!(spec = %spec, len = values.len(), "Captured snapshot");
        Ok(Self { values })
    }

    /// Captures an attribute of every match instead of its text.
    ///
    /// Missing attributes are captured as empty strings.
    pub async fn capture_attribute(
        session: &Session,
        spec: &LocatorSpec,
        name: &str,
    ) -> Result<Self> {
        let mut values = Vec::new();
        if let Some(all) = session.resolve_all(spec).await? {
            for element in &all.elements {
                let value = session.attribute(element, name).await?.unwrap_or_default();
                values.push(value.trim().to_string());
            }
        }
        Ok(Self { values })
    }

    /// Returns the values in order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the number of values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was captured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the first value.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

// ============================================================================
// SortKey / SortOrder
// ============================================================================

/// How values are compared when checking order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Numeric when every value parses as a number, lexical otherwise.
    #[default]
    Auto,
    /// Parsed numbers; currency symbols and thousands separators ignored.
    Numeric,
    /// Plain string comparison.
    Lexical,
    /// String comparison ignoring case.
    CaseInsensitive,
}

/// Direction of an ordered sequence. Ties are allowed in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Each value is greater than or equal to the previous one.
    Ascending,
    /// Each value is less than or equal to the previous one.
    Descending,
    /// Every value compares equal.
    Constant,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("ascending"),
            Self::Descending => f.write_str("descending"),
            Self::Constant => f.write_str("constant"),
        }
    }
}

/// Currency marks accepted around a numeric display value.
const CURRENCY_MARKS: &[char] = &['$', '€', '£', '¥'];

/// Parses a display value such as `"$1,299.00"` as a number.
///
/// Only whitespace and currency marks may surround the digits, so labels
/// that merely contain a number (`"Model 10"`) are not numeric.
#[must_use]
pub fn parse_number(value: &str) -> Option<f64> {
    let core = value.trim_matches(|c: char| c.is_whitespace() || CURRENCY_MARKS.contains(&c));
    let numeric_start = |c: char| c.is_ascii_digit() || c == '-' || c == '.';
    if !core.starts_with(numeric_start) {
        return None;
    }
    core.replace(',', "").parse().ok()
}

// ============================================================================
// Verdict
// ============================================================================

/// Comparison of two non-empty snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Some position up to the shorter length holds a different value.
    pub changed: bool,
    /// First differing position, if any.
    pub first_changed: Option<usize>,
    /// Order of the `after` snapshot, `None` when unordered.
    pub monotonic: Option<SortOrder>,
    /// Key actually used (never [`SortKey::Auto`]).
    pub key: SortKey,
}

impl Diff {
    /// Returns `true` if the first item differs.
    #[inline]
    #[must_use]
    pub fn first_item_changed(&self) -> bool {
        self.first_changed == Some(0)
    }
}

/// Outcome of comparing two snapshots.
///
/// `Insufficient` means "skip", never "pass".
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// At least one snapshot is empty.
    Insufficient {
        /// Length of the `before` snapshot.
        before: usize,
        /// Length of the `after` snapshot.
        after: usize,
    },
    /// Both snapshots had data.
    Compared(Diff),
}

impl Verdict {
    /// Returns `true` for [`Verdict::Insufficient`].
    #[inline]
    #[must_use]
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::Insufficient { .. })
    }

    /// Returns the comparison, if there was enough data.
    #[must_use]
    pub fn diff(&self) -> Option<&Diff> {
        match self {
            Self::Compared(diff) => Some(diff),
            Self::Insufficient { .. } => None,
        }
    }

    /// Returns whether the snapshots differ, if there was enough data.
    #[must_use]
    pub fn changed(&self) -> Option<bool> {
        self.diff().map(|d| d.changed)
    }

    /// Returns the order of `after`, if there was enough data and it is ordered.
    #[must_use]
    pub fn monotonic(&self) -> Option<SortOrder> {
        self.diff().and_then(|d| d.monotonic)
    }
}

// ============================================================================
// Diff
// ============================================================================

/// Compares snapshots with [`SortKey::Auto`].
#[must_use]
pub fn diff(before: &Snapshot, after: &Snapshot) -> Verdict {
    diff_by(before, after, SortKey::Auto)
}

/// Compares snapshots using `key` for the order check.
///
/// Values that fail to parse under [`SortKey::Numeric`] make the order
/// `None`.
#[must_use]
pub fn diff_by(before: &Snapshot, after: &Snapshot, key: SortKey) -> Verdict {
    if before.is_empty() || after.is_empty() {
        return Verdict::Insufficient {
            before: before.len(),
            after: after.len(),
        };
    }

    let first_changed = before
        .values
        .iter()
        .zip(&after.values)
        .position(|(b, a)| b != a);

    let key = match key {
        SortKey::Auto if after.values.iter().all(|v| parse_number(v).is_some()) => {
            SortKey::Numeric
        }
        SortKey::Auto => SortKey::Lexical,
        other => other,
    };

    let diff = Diff {
        changed: first_changed.is_some(),
        first_changed,
        monotonic: order_of(&after.values, key),
        key,
    };
    debug!(
        changed = diff.changed,
        monotonic = ?diff.monotonic,
        key = ?diff.key,
        "Compared snapshots"
    );
    Verdict::Compared(diff)
}

/// Pairwise order of `values` under a resolved key.
fn order_of(values: &[String], key: SortKey) -> Option<SortOrder> {
    let mut ascending = true;
    let mut descending = true;

    for pair in values.windows(2) {
        match compare(&pair[0], &pair[1], key)? {
            Ordering::Less => descending = false,
            Ordering::Greater => ascending = false,
            Ordering::Equal => {}
        }
    }

    match (ascending, descending) {
        (true, true) => Some(SortOrder::Constant),
        (true, false) => Some(SortOrder::Ascending),
        (false, true) => Some(SortOrder::Descending),
        (false, false) => None,
    }
}

fn compare(a: &str, b: &str, key: SortKey) -> Option<Ordering> {
    match key {
        SortKey::Numeric | SortKey::Auto => Some(parse_number(a)?.total_cmp(&parse_number(b)?)),
        SortKey::Lexical => Some(a.cmp(b)),
        SortKey::CaseInsensitive => Some(a.to_lowercase().cmp(&b.to_lowercase())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::locator::By;
    use crate::sim::{SimBrowser, SimNode};

    fn snap(values: &[&str]) -> Snapshot {
        Snapshot::from_values(values.iter().copied())
    }

    #[test]
    fn test_price_sort_is_ascending() {
        let verdict = diff(&snap(&["30", "10", "20"]), &snap(&["10", "20", "30"]));
        let d = verdict.diff().unwrap();
        assert!(d.changed);
        assert!(d.first_item_changed());
        assert_eq!(d.monotonic, Some(SortOrder::Ascending));
        assert_eq!(d.key, SortKey::Numeric);
    }

    #[test]
    fn test_currency_values_compare_numerically() {
        let after = snap(&["$7.99", "$9.99", "$15.99", "$29.99", "$49.99"]);
        assert_eq!(diff(&after, &after).monotonic(), Some(SortOrder::Ascending));

        let after = snap(&["$1,299.00", "$129.00", "$12.99"]);
        assert_eq!(diff(&after, &after).monotonic(), Some(SortOrder::Descending));
    }

    #[test]
    fn test_numeric_key_not_fooled_by_lexical_order() {
        let after = snap(&["9", "10", "100"]);
        assert_eq!(
            diff_by(&after, &after, SortKey::Lexical).monotonic(),
            None
        );
        assert_eq!(
            diff_by(&after, &after, SortKey::Numeric).monotonic(),
            Some(SortOrder::Ascending)
        );
    }

    #[test]
    fn test_names_descending() {
        let before = snap(&["Backpack", "Bike Light", "Onesie"]);
        let after = snap(&["Onesie", "Bike Light", "Backpack"]);
        let verdict = diff(&before, &after);
        assert_eq!(verdict.changed(), Some(true));
        assert_eq!(verdict.monotonic(), Some(SortOrder::Descending));
        assert_eq!(verdict.diff().unwrap().key, SortKey::Lexical);
    }

    #[test]
    fn test_names_with_digits_compare_as_text() {
        let before = snap(&["Model 1", "Model 10", "Model 9"]);
        let after = snap(&["Model 9", "Model 10", "Model 1"]);
        let verdict = diff(&before, &after);
        let d = verdict.diff().unwrap();
        assert_eq!(d.key, SortKey::Lexical);
        assert_eq!(d.monotonic, Some(SortOrder::Descending));
    }

    #[test]
    fn test_case_insensitive_key() {
        let after = snap(&["apple", "Banana", "cherry"]);
        assert_eq!(diff_by(&after, &after, SortKey::Lexical).monotonic(), None);
        assert_eq!(
            diff_by(&after, &after, SortKey::CaseInsensitive).monotonic(),
            Some(SortOrder::Ascending)
        );
    }

    #[test]
    fn test_changed_only_compares_common_prefix() {
        let verdict = diff(&snap(&["a", "b"]), &snap(&["a", "b", "c"]));
        assert_eq!(verdict.changed(), Some(false));
    }

    #[test]
    fn test_constant_and_single_value() {
        assert_eq!(diff(&snap(&["5"]), &snap(&["5"])).monotonic(), Some(SortOrder::Constant));
        assert_eq!(
            diff(&snap(&["x", "x"]), &snap(&["x", "x"])).monotonic(),
            Some(SortOrder::Constant)
        );
    }

    #[test]
    fn test_unordered_is_none() {
        assert_eq!(diff(&snap(&["1"]), &snap(&["2", "1", "3"])).monotonic(), None);
    }

    #[test]
    fn test_empty_snapshot_is_insufficient() {
        let verdict = diff(&Snapshot::default(), &snap(&["1"]));
        assert!(verdict.is_insufficient());
        assert_eq!(verdict.changed(), None);
        assert_eq!(verdict, Verdict::Insufficient { before: 0, after: 1 });
        assert!(diff(&snap(&["1"]), &Snapshot::default()).is_insufficient());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("$29.99"), Some(29.99));
        assert_eq!(parse_number(" 1,299 "), Some(1299.0));
        assert_eq!(parse_number("-4"), Some(-4.0));
        assert_eq!(parse_number("1,299.00 €"), Some(1299.0));
        assert_eq!(parse_number("Total: 12 items"), None);
        assert_eq!(parse_number("Model 9"), None);
        assert_eq!(parse_number("12a"), None);
        assert_eq!(parse_number("Sauce Labs Onesie"), None);
        assert_eq!(parse_number(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_trims_text() {
        let browser = SimBrowser::new();
        browser.page(
            "https://example.test/",
            vec![
                SimNode::new("div").class("price").text("  $9.99 "),
                SimNode::new("div").class("price").text("$7.99"),
                SimNode::new("a").attr("data-rank", "2"),
            ],
        );
        browser.open("https://example.test/");
        let session = Session::new(browser);

        let prices = Snapshot::capture(&session, &LocatorSpec::new(By::class("price")))
            .await
            .unwrap();
        assert_eq!(prices.values(), ["$9.99", "$7.99"]);
        assert_eq!(prices.first(), Some("$9.99"));

        let ranks = Snapshot::capture_attribute(&session, &LocatorSpec::new(By::tag("a")), "data-rank")
            .await
            .unwrap();
        assert_eq!(ranks.values(), ["2"]);

        let none = Snapshot::capture(&session, &LocatorSpec::new(By::class("missing")))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    proptest! {
        #[test]
        fn prop_identical_snapshots_unchanged(values in proptest::collection::vec("[a-z0-9$.]{0,8}", 1..12)) {
            let s = Snapshot::from_values(values);
            prop_assert_eq!(diff(&s, &s).changed(), Some(false));
        }

        #[test]
        fn prop_sorted_numbers_ascending(mut values in proptest::collection::vec(0u32..100_000, 2..20)) {
            values.sort_unstable();
            let before = Snapshot::from_values(values.iter().rev().map(u32::to_string));
            let after = Snapshot::from_values(values.iter().map(u32::to_string));
            let monotonic = diff(&before, &after).monotonic();
            prop_assert!(matches!(monotonic, Some(SortOrder::Ascending | SortOrder::Constant)));
        }
    }
}
