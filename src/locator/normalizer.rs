//! Selector normalization.
//!
//! Validates a raw selector and massages it into the canonical form the
//! query builder consumes: kind-specific tags and types are inserted,
//! invalid key combinations are rejected, and non-standard attribute keys
//! are recorded so timeout diagnostics can point out probable typos.
//!
//! Normalization is a pure transform; it performs no I/O.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use crate::element::kind::{BUTTON_INPUT_TYPES, ElementKind, NON_TEXT_INPUT_TYPES};
use crate::error::{Error, Result};
use crate::selector::{Adjacent, Selector, SelectorKey, SelectorValue};

// ============================================================================
// Standard Attributes
// ============================================================================

/// HTML attributes the library considers standard. Anything else is
/// matched as requested but flagged in timeout diagnostics.
static STANDARD_ATTRIBUTES: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "accept", "action", "alt", "autocomplete", "checked", "cols", "colspan", "disabled",
        "for", "height", "href", "id", "lang", "max", "maxlength", "method", "min", "multiple",
        "name", "pattern", "placeholder", "readonly", "rel", "required", "rows", "rowspan",
        "selected", "size", "src", "step", "style", "tabindex", "target", "title", "type",
        "value", "width",
    ]
    .into_iter()
    .collect()
});

fn is_standard_attribute(name: &str) -> bool {
    let name = name.replace('_', "-");
    STANDARD_ATTRIBUTES.contains(name.as_str())
        || name.starts_with("data-")
        || name.starts_with("aria-")
}

// ============================================================================
// Normalized
// ============================================================================

/// Canonical selector form, ready for the query builder.
#[derive(Debug, Clone)]
pub(crate) struct Normalized {
    /// Key/value entries in original order, with kind rules applied.
    pub pairs: Vec<(SelectorKey, SelectorValue)>,
    /// Explicit index, if any.
    pub index: Option<i64>,
    /// Structural axis, if any.
    pub adjacent: Option<Adjacent>,
    /// Attribute keys outside the standard HTML set, kept for diagnostics.
    pub custom_attributes: Vec<String>,
}

// ============================================================================
// Normalization
// ============================================================================

/// Validates and canonicalises a selector for the given element kind.
pub(crate) fn normalize(selector: &Selector, kind: ElementKind) -> Result<Normalized> {
    validate_exclusive_keys(selector)?;

    let mut pairs: Vec<(SelectorKey, SelectorValue)> = selector.pairs().to_vec();

    validate_values(&pairs)?;
    apply_kind_rules(&mut pairs, kind, selector)?;

    let custom_attributes = pairs
        .iter()
        .filter_map(|(k, _)| match k {
            SelectorKey::Attribute(name) if !is_standard_attribute(name) => Some(name.clone()),
            _ => None,
        })
        .collect();

    Ok(Normalized {
        pairs,
        index: selector.index_value(),
        adjacent: selector.adjacent_value(),
        custom_attributes,
    })
}

/// `xpath`/`css` are whole-query passthroughs; mixing them with other
/// locator keys is ambiguous and rejected outright.
fn validate_exclusive_keys(selector: &Selector) -> Result<()> {
    let has_xpath = selector.has(&SelectorKey::Xpath);
    let has_css = selector.has(&SelectorKey::Css);

    if has_xpath && has_css {
        return Err(Error::invalid_selector(format!(
            "xpath and css cannot be combined: {selector}"
        )));
    }
    if has_xpath || has_css {
        let others = selector
            .pairs()
            .iter()
            .filter(|(k, _)| !matches!(k, SelectorKey::Xpath | SelectorKey::Css))
            .count();
        if others > 0 {
            return Err(Error::invalid_selector(format!(
                "xpath/css cannot be combined with other locators: {selector}"
            )));
        }
    }
    Ok(())
}

fn validate_values(pairs: &[(SelectorKey, SelectorValue)]) -> Result<()> {
    for (key, value) in pairs {
        match key {
            SelectorKey::Visible => {
                if !matches!(value, SelectorValue::Bool(_)) {
                    return Err(Error::invalid_selector(format!(
                        "expected true or false for visible, got {value}"
                    )));
                }
            }
            SelectorKey::TagName | SelectorKey::Xpath | SelectorKey::Css => {
                if matches!(value, SelectorValue::Bool(_) | SelectorValue::Any(_)) {
                    return Err(Error::invalid_selector(format!(
                        "expected a string or pattern for {key}, got {value}"
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply_kind_rules(
    pairs: &mut Vec<(SelectorKey, SelectorValue)>,
    kind: ElementKind,
    selector: &Selector,
) -> Result<()> {
    // Kinds that pin exactly one tag override any user-supplied tag.
    if let Some(tag) = kind.forced_tag() {
        pairs.retain(|(k, _)| *k != SelectorKey::TagName);
        pairs.insert(0, (SelectorKey::TagName, SelectorValue::Str(tag.into())));
    }

    if let Some(ty) = kind.forced_type() {
        let type_key = SelectorKey::Attribute("type".into());
        if !pairs.iter().any(|(k, _)| *k == type_key) {
            pairs.push((type_key, SelectorValue::Str(ty.into())));
        }
    }

    // Type restrictions that make a selector unsatisfiable are usage
    // errors, reported before any query runs.
    let type_key = SelectorKey::Attribute("type".into());
    if let Some(SelectorValue::Str(t)) = pairs
        .iter()
        .find(|(k, _)| *k == type_key)
        .map(|(_, v)| v.clone())
    {
        let t = t.to_ascii_lowercase();
        match kind {
            ElementKind::Button if !BUTTON_INPUT_TYPES.contains(&t.as_str()) => {
                return Err(Error::locator(format!(
                    "button elements cannot be located by input type: {t} ({selector})"
                )));
            }
            ElementKind::TextField if NON_TEXT_INPUT_TYPES.contains(&t.as_str()) => {
                return Err(Error::locator(format!(
                    "text fields cannot be located by type: {t} ({selector})"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Pattern;

    #[test]
    fn test_xpath_with_other_keys_rejected() {
        let sel = Selector::new().xpath(".//div").id("foo");
        let err = normalize(&sel, ElementKind::Generic).unwrap_err();
        assert!(err.is_usage(), "expected usage error, got {err:?}");
    }

    #[test]
    fn test_xpath_with_index_allowed() {
        let sel = Selector::new().xpath(".//div").index(2);
        assert!(normalize(&sel, ElementKind::Generic).is_ok());
    }

    #[test]
    fn test_xpath_and_css_rejected() {
        let sel = Selector::new().xpath(".//div").css("div");
        assert!(normalize(&sel, ElementKind::Generic).is_err());
    }

    #[test]
    fn test_forced_tag_inserted() {
        let sel = Selector::new().id("country");
        let n = normalize(&sel, ElementKind::Select).unwrap();
        assert_eq!(
            n.pairs[0],
            (SelectorKey::TagName, SelectorValue::Str("select".into()))
        );
    }

    #[test]
    fn test_checkbox_type_added() {
        let sel = Selector::new().name("accept");
        let n = normalize(&sel, ElementKind::Checkbox).unwrap();
        assert!(n.pairs.contains(&(
            SelectorKey::Attribute("type".into()),
            SelectorValue::Str("checkbox".into())
        )));
    }

    #[test]
    fn test_non_text_type_rejected_for_text_field() {
        let sel = Selector::new().attr("type", "radio");
        let err = normalize(&sel, ElementKind::TextField).unwrap_err();
        assert!(matches!(err, Error::Locator { .. }));
    }

    #[test]
    fn test_bad_button_type_rejected() {
        let sel = Selector::new().attr("type", "text");
        assert!(normalize(&sel, ElementKind::Button).is_err());
    }

    #[test]
    fn test_custom_attributes_recorded() {
        let sel = Selector::new().attr("hreff", "x").attr("data_role", "menu");
        let n = normalize(&sel, ElementKind::Generic).unwrap();
        assert_eq!(n.custom_attributes, vec!["hreff".to_string()]);
    }

    #[test]
    fn test_visible_requires_bool() {
        let sel = Selector::new().attr("id", "x").visible(true);
        assert!(normalize(&sel, ElementKind::Generic).is_ok());

        let mut sel = Selector::new();
        sel = sel.text(Pattern::new("x").unwrap());
        assert!(normalize(&sel, ElementKind::Generic).is_ok());
    }
}
