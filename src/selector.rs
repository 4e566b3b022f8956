//! Structured element selectors.
//!
//! A [`Selector`] is an ordered mapping from locator keys to values.
//! Values may be literal strings, presence/absence booleans, regular
//! expressions ([`Pattern`]), or arrays of alternatives (OR semantics).
//!
//! # Example
//!
//! ```ignore
//! use lazydriver::{Pattern, Selector};
//!
//! let sel = Selector::new().id("login-form");
//! let sel = Selector::new().class("btn").text("Submit");
//! let sel = Selector::new().attr("data_role", "menu").index(2);
//! let sel = Selector::new().name(Pattern::new("^user")?);
//! ```
//!
//! Selectors are cheap to build and immutable once handed to an element
//! constructor; compilation into a query expression happens lazily at
//! first use.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};

// ============================================================================
// Pattern
// ============================================================================

/// A regular-expression selector value.
///
/// Carries its source text and case-insensitivity flag alongside the
/// compiled regex so the query builder can analyse whether the pattern is
/// reducible to a substring match.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Compiles a case-sensitive pattern.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        Self::compile(source.into(), false)
    }

    /// Compiles a case-insensitive pattern.
    ///
    /// Case-insensitive patterns are never folded into a query expression;
    /// they are always checked against candidates after retrieval.
    pub fn new_case_insensitive(source: impl Into<String>) -> Result<Self> {
        Self::compile(source.into(), true)
    }

    fn compile(source: String, case_insensitive: bool) -> Result<Self> {
        let full = if case_insensitive {
            format!("(?i){source}")
        } else {
            source.clone()
        };
        let regex = Regex::new(&full)
            .map_err(|e| Error::invalid_selector(format!("invalid pattern /{source}/: {e}")))?;
        Ok(Self {
            source,
            case_insensitive,
            regex,
        })
    }

    /// Returns the pattern source text.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns whether the pattern matches case-insensitively.
    #[inline]
    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Tests the pattern against a candidate string.
    #[inline]
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)?;
        if self.case_insensitive {
            f.write_str("i")?;
        }
        Ok(())
    }
}

// ============================================================================
// Adjacent
// ============================================================================

/// Structural axis selecting relatives of the query scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacent {
    /// Any ancestor element.
    Ancestor,
    /// Preceding siblings.
    Preceding,
    /// Following siblings.
    Following,
    /// Direct children.
    Child,
}

impl Adjacent {
    /// Returns the XPath axis expression for this relation.
    pub(crate) fn axis(self) -> &'static str {
        match self {
            Self::Ancestor => "./ancestor::*",
            Self::Preceding => "./preceding-sibling::*",
            Self::Following => "./following-sibling::*",
            Self::Child => "./child::*",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Ancestor => "ancestor",
            Self::Preceding => "preceding",
            Self::Following => "following",
            Self::Child => "child",
        }
    }
}

// ============================================================================
// SelectorKey
// ============================================================================

/// Locator key of one selector entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorKey {
    /// Element tag name.
    TagName,
    /// Class token(s); boundary-safe matching, `!` prefix negates.
    Class,
    /// `id` attribute.
    Id,
    /// `name` attribute.
    Name,
    /// Rendered text (or value, for user-editable elements).
    Text,
    /// Associated `<label>` element text.
    Label,
    /// Visibility; never expressible in a query, always post-filtered.
    Visible,
    /// Raw XPath passthrough; exclusive with other non-structural keys.
    Xpath,
    /// Raw CSS passthrough; exclusive with other non-structural keys.
    Css,
    /// Any other HTML attribute. Underscores are translated to hyphens
    /// when the query is built (`data_role` matches `data-role`).
    Attribute(String),
}

impl fmt::Display for SelectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagName => f.write_str("tag_name"),
            Self::Class => f.write_str("class"),
            Self::Id => f.write_str("id"),
            Self::Name => f.write_str("name"),
            Self::Text => f.write_str("text"),
            Self::Label => f.write_str("label"),
            Self::Visible => f.write_str("visible"),
            Self::Xpath => f.write_str("xpath"),
            Self::Css => f.write_str("css"),
            Self::Attribute(name) => f.write_str(name),
        }
    }
}

// ============================================================================
// SelectorValue
// ============================================================================

/// Value of one selector entry.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorValue {
    /// Literal string, matched exactly.
    Str(String),
    /// Presence (`true`) or absence (`false`) of the attribute.
    Bool(bool),
    /// Regular expression match.
    Pattern(Pattern),
    /// Alternatives, any of which may match (OR).
    Any(Vec<SelectorValue>),
}

impl From<&str> for SelectorValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for SelectorValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for SelectorValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Pattern> for SelectorValue {
    fn from(p: Pattern) -> Self {
        Self::Pattern(p)
    }
}

impl From<Vec<SelectorValue>> for SelectorValue {
    fn from(v: Vec<SelectorValue>) -> Self {
        Self::Any(v)
    }
}

impl From<&[&str]> for SelectorValue {
    fn from(v: &[&str]) -> Self {
        Self::Any(v.iter().map(|s| SelectorValue::from(*s)).collect())
    }
}

impl From<Vec<&str>> for SelectorValue {
    fn from(v: Vec<&str>) -> Self {
        Self::Any(v.into_iter().map(SelectorValue::from).collect())
    }
}

impl fmt::Display for SelectorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Pattern(p) => write!(f, "{p}"),
            Self::Any(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

/// Ordered mapping describing which element(s) to find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pairs: Vec<(SelectorKey, SelectorValue)>,
    index: Option<i64>,
    adjacent: Option<Adjacent>,
}

impl Selector {
    /// Creates an empty selector (matches any descendant).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Builder methods
    // ------------------------------------------------------------------

    /// Adds a tag-name entry.
    #[must_use]
    pub fn tag_name(self, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::TagName, value)
    }

    /// Adds an `id` entry.
    #[must_use]
    pub fn id(self, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::Id, value)
    }

    /// Adds a `name` entry.
    #[must_use]
    pub fn name(self, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::Name, value)
    }

    /// Adds a class entry. A `!` prefix on a token negates it; an array
    /// value ANDs its tokens.
    #[must_use]
    pub fn class(self, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::Class, value)
    }

    /// Adds a text entry.
    #[must_use]
    pub fn text(self, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::Text, value)
    }

    /// Adds an associated-label entry.
    #[must_use]
    pub fn label(self, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::Label, value)
    }

    /// Requires the element to be visible (or hidden, with `false`).
    #[must_use]
    pub fn visible(self, visible: bool) -> Self {
        self.push(SelectorKey::Visible, visible)
    }

    /// Adds an arbitrary attribute entry.
    #[must_use]
    pub fn attr(self, name: impl Into<String>, value: impl Into<SelectorValue>) -> Self {
        self.push(SelectorKey::Attribute(name.into()), value)
    }

    /// Uses a raw XPath expression. Exclusive with other locator keys.
    #[must_use]
    pub fn xpath(self, expression: impl Into<String>) -> Self {
        self.push(SelectorKey::Xpath, expression.into())
    }

    /// Uses a raw CSS selector. Exclusive with other locator keys.
    #[must_use]
    pub fn css(self, expression: impl Into<String>) -> Self {
        self.push(SelectorKey::Css, expression.into())
    }

    /// Adds an entry under an explicit key, for keys without a dedicated
    /// builder method or with non-obvious value types.
    #[must_use]
    pub fn add(self, key: SelectorKey, value: impl Into<SelectorValue>) -> Self {
        self.push(key, value)
    }

    /// Selects the nth match (zero-based). Negative values count from the
    /// end. Applied after residual filtering.
    #[must_use]
    pub fn index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    /// Selects relatives of the query scope along a structural axis.
    #[must_use]
    pub fn adjacent(mut self, adjacent: Adjacent) -> Self {
        self.adjacent = Some(adjacent);
        self
    }

    fn push(mut self, key: SelectorKey, value: impl Into<SelectorValue>) -> Self {
        self.pairs.push((key, value.into()));
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the ordered key/value entries.
    #[must_use]
    pub fn pairs(&self) -> &[(SelectorKey, SelectorValue)] {
        &self.pairs
    }

    /// Returns the explicit index, if any.
    #[must_use]
    pub fn index_value(&self) -> Option<i64> {
        self.index
    }

    /// Returns the structural axis, if any.
    #[must_use]
    pub fn adjacent_value(&self) -> Option<Adjacent> {
        self.adjacent
    }

    /// Returns the value of the first entry with the given key.
    #[must_use]
    pub fn get(&self, key: &SelectorKey) -> Option<&SelectorValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns `true` if an entry with the given key exists.
    #[must_use]
    pub fn has(&self, key: &SelectorKey) -> bool {
        self.get(key).is_some()
    }

    /// Returns `true` if the selector has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.index.is_none() && self.adjacent.is_none()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for (key, value) in &self.pairs {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
            first = false;
        }
        if let Some(i) = self.index {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "index: {i}")?;
            first = false;
        }
        if let Some(a) = self.adjacent {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "adjacent: {}", a.name())?;
        }
        f.write_str("}")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let p = Pattern::new("^foo").unwrap();
        assert!(p.is_match("foobar"));
        assert!(!p.is_match("barfoo"));
        assert!(!p.is_case_insensitive());
    }

    #[test]
    fn test_pattern_case_insensitive() {
        let p = Pattern::new_case_insensitive("submit").unwrap();
        assert!(p.is_match("SUBMIT"));
        assert!(p.is_case_insensitive());
        assert_eq!(p.to_string(), "/submit/i");
    }

    #[test]
    fn test_pattern_invalid() {
        assert!(Pattern::new("[unclosed").is_err());
    }

    #[test]
    fn test_selector_display() {
        let sel = Selector::new().id("foo").class("btn").index(2);
        assert_eq!(sel.to_string(), r#"{id: "foo", class: "btn", index: 2}"#);
    }

    #[test]
    fn test_selector_accessors() {
        let sel = Selector::new()
            .attr("data_role", "menu")
            .adjacent(Adjacent::Child);
        assert!(sel.has(&SelectorKey::Attribute("data_role".into())));
        assert_eq!(sel.adjacent_value(), Some(Adjacent::Child));
        assert!(!sel.is_empty());
        assert!(Selector::new().is_empty());
    }

    #[test]
    fn test_value_alternatives() {
        let sel = Selector::new().class(SelectorValue::Any(vec![
            "nav".into(),
            "!hidden".into(),
        ]));
        match sel.get(&SelectorKey::Class) {
            Some(SelectorValue::Any(values)) => assert_eq!(values.len(), 2),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn test_adjacent_axes() {
        assert_eq!(Adjacent::Ancestor.axis(), "./ancestor::*");
        assert_eq!(Adjacent::Child.axis(), "./child::*");
    }
}
