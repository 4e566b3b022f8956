//! Element location.
//!
//! The locator turns a [`Selector`](crate::selector::Selector) into node
//! references in three stages:
//!
//! 1. **Normalize** the selector and reject invalid combinations.
//! 2. **Build** an XPath query, pushing as much matching as possible into
//!    the query and keeping the rest as residual predicates.
//! 3. **Filter** the driver's candidates through the residual predicates
//!    and apply any deferred index.
//!
//! Raw `xpath`/`css` selectors skip the builder and go straight to the
//! driver, with tag validation applied to each candidate instead.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::driver::{DriverError, NodeRef, Query, WebDriver};
use crate::element::kind::ElementKind;
use crate::error::{Error, Result};
use crate::selector::{Selector, SelectorKey, SelectorValue};

pub(crate) mod normalizer;
pub(crate) mod validator;
pub(crate) mod xpath;

use xpath::{Matcher, ResidualPredicate, ResidualTarget};

// ============================================================================
// Entry Points
// ============================================================================

/// Locates every matching node, in document order, residual filters and
/// deferred index applied.
pub(crate) async fn locate_all(
    driver: &dyn WebDriver,
    scope: Option<&NodeRef>,
    scope_tag: Option<&str>,
    selector: &Selector,
    kind: ElementKind,
) -> Result<Vec<NodeRef>> {
    if let Some(query) = raw_query(selector)? {
        return locate_raw(driver, scope, selector, kind, &query).await;
    }

    let normalized = normalizer::normalize(selector, kind)?;
    let built = xpath::build(&normalized, kind, scope_tag)?;
    debug!(query = %built.query, residual = built.residual.len(), "locating");

    let candidates = match driver.find_elements(scope, &built.query).await {
        Ok(nodes) => nodes,
        Err(DriverError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(Error::Driver(e)),
    };

    let mut matched = Vec::with_capacity(candidates.len());
    for node in candidates {
        if residual_match(driver, &node, &built.residual).await? {
            matched.push(node);
        }
    }

    Ok(apply_index(matched, built.index))
}

/// Locates the first matching node, or `None` when nothing matches.
pub(crate) async fn locate_first(
    driver: &dyn WebDriver,
    scope: Option<&NodeRef>,
    scope_tag: Option<&str>,
    selector: &Selector,
    kind: ElementKind,
) -> Result<Option<NodeRef>> {
    let all = locate_all(driver, scope, scope_tag, selector, kind).await?;
    Ok(all.into_iter().next())
}

// ============================================================================
// Raw Queries
// ============================================================================

fn raw_query(selector: &Selector) -> Result<Option<Query>> {
    let query = match (
        selector.get(&SelectorKey::Xpath),
        selector.get(&SelectorKey::Css),
    ) {
        (Some(SelectorValue::Str(x)), None) => Query::xpath(x.clone()),
        (None, Some(SelectorValue::Str(c))) => Query::css(c.clone()),
        (None, None) => return Ok(None),
        _ => {
            return Err(Error::invalid_selector(format!(
                "xpath and css cannot be combined: {selector}"
            )));
        }
    };

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

    Ok(Some(query))
}

async fn locate_raw(
    driver: &dyn WebDriver,
    scope: Option<&NodeRef>,
    selector: &Selector,
    kind: ElementKind,
    query: &Query,
) -> Result<Vec<NodeRef>> {
    debug!(query = %query, "locating (raw)");
    let candidates = match driver.find_elements(scope, query).await {
        Ok(nodes) => nodes,
        Err(DriverError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(Error::Driver(e)),
    };

    let mut matched = Vec::with_capacity(candidates.len());
    for node in candidates {
        if validator::validate(driver, &node, kind, None)
            .await
            .map_err(Error::Driver)?
        {
            matched.push(node);
        }
    }

    Ok(apply_index(matched, selector.index_value()))
}

// ============================================================================
// Residual Filtering
// ============================================================================

async fn residual_match(
    driver: &dyn WebDriver,
    node: &NodeRef,
    residual: &[ResidualPredicate],
) -> Result<bool> {
    for predicate in residual {
        let actual: Option<String> = match &predicate.target {
            ResidualTarget::Attribute(name) => {
                driver.attribute(node, name).await.map_err(Error::Driver)?
            }
            ResidualTarget::Text => Some(driver.text(node).await.map_err(Error::Driver)?),
            ResidualTarget::Value => driver
                .attribute(node, "value")
                .await
                .map_err(Error::Driver)?,
            ResidualTarget::TextOrValue => {
                let text = driver.text(node).await.map_err(Error::Driver)?;
                if matcher_hits(&predicate.matcher, Some(&text)) {
                    continue;
                }
                driver
                    .attribute(node, "value")
                    .await
                    .map_err(Error::Driver)?
            }
            ResidualTarget::TagName => Some(
                driver
                    .tag_name(node)
                    .await
                    .map_err(Error::Driver)?
                    .to_ascii_lowercase(),
            ),
            ResidualTarget::OptionLabel => {
                let options = driver
                    .find_elements(Some(node), &Query::xpath(".//*[local-name()='option']"))
                    .await
                    .map_err(Error::Driver)?;
                let mut hit = false;
                for option in &options {
                    let label = driver.text(option).await.map_err(Error::Driver)?;
                    if matcher_hits(&predicate.matcher, Some(&label)) {
                        hit = true;
                        break;
                    }
                }
                if !hit {
                    return Ok(false);
                }
                continue;
            }
            ResidualTarget::LabelText => {
                let mut hit = false;
                for label in label_texts(driver, node).await? {
                    if matcher_hits(&predicate.matcher, Some(&label)) {
                        hit = true;
                        break;
                    }
                }
                if !hit {
                    return Ok(false);
                }
                continue;
            }
            ResidualTarget::Visibility => {
                let displayed = driver.is_displayed(node).await.map_err(Error::Driver)?;
                let wanted = matches!(predicate.matcher, Matcher::Bool(true));
                if displayed != wanted {
                    return Ok(false);
                }
                continue;
            }
        };

        if !matcher_hits(&predicate.matcher, actual.as_deref()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Texts of the labels associated with `node`: wrapping ancestors plus
/// any `<label for=…>` linked through the node's id.
async fn label_texts(driver: &dyn WebDriver, node: &NodeRef) -> Result<Vec<String>> {
    let mut labels = driver
        .find_elements(
            Some(node),
            &Query::xpath("./ancestor::*[local-name()='label']"),
        )
        .await
        .map_err(Error::Driver)?;

    if let Some(id) = driver.attribute(node, "id").await.map_err(Error::Driver)? {
        let linked = driver
            .find_elements(
                None,
                &Query::xpath(format!(
                    ".//*[local-name()='label'][@for={}]",
                    xpath::escape(&id)
                )),
            )
            .await
            .map_err(Error::Driver)?;
        labels.extend(linked);
    }

    let mut texts = Vec::with_capacity(labels.len());
    for label in &labels {
        texts.push(driver.text(label).await.map_err(Error::Driver)?);
    }
    Ok(texts)
}

fn matcher_hits(matcher: &Matcher, actual: Option<&str>) -> bool {
    match (matcher, actual) {
        (Matcher::Literal(expected), Some(actual)) => expected == actual,
        (Matcher::Pattern(pattern), Some(actual)) => pattern.is_match(actual),
        (Matcher::Bool(present), actual) => *present == actual.is_some(),
        (_, None) => false,
    }
}

// ============================================================================
// Index
// ============================================================================

fn apply_index(matched: Vec<NodeRef>, index: Option<i64>) -> Vec<NodeRef> {
    match index {
        None => matched,
        Some(i) if i >= 0 => matched.into_iter().nth(i as usize).into_iter().collect(),
        Some(i) => {
            let offset = -i as usize;
            if offset > matched.len() {
                Vec::new()
            } else {
                let pick = matched.len() - offset;
                matched.into_iter().nth(pick).into_iter().collect()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
