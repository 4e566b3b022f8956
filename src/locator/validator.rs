//! Tag validation for raw-query matches.
//!
//! Built queries pin the tag themselves, but a raw XPath or CSS selector
//! can match anything. Candidates from raw queries are checked against
//! the element kind so a handle never wraps an incompatible node.

// ============================================================================
// Imports
// ============================================================================

use crate::driver::{DriverResult, NodeRef, WebDriver};
use crate::element::kind::{BUTTON_INPUT_TYPES, ElementKind};

// ============================================================================
// Validation
// ============================================================================

/// Returns whether `node` is tag-compatible with `kind`. For `Generic`,
/// compatibility means matching `selector_tag` when one was given.
pub(crate) async fn validate(
    driver: &dyn WebDriver,
    node: &NodeRef,
    kind: ElementKind,
    selector_tag: Option<&str>,
) -> DriverResult<bool> {
    let tag = driver.tag_name(node).await?.to_ascii_lowercase();

    let ok = match kind {
        ElementKind::Button => {
            tag == "button"
                || (tag == "input" && {
                    let ty = driver
                        .attribute(node, "type")
                        .await?
                        .unwrap_or_default()
                        .to_ascii_lowercase();
                    BUTTON_INPUT_TYPES.contains(&ty.as_str())
                })
        }
        ElementKind::TextField | ElementKind::Checkbox | ElementKind::Radio => tag == "input",
        ElementKind::TextArea => tag == "textarea",
        ElementKind::Select => tag == "select",
        ElementKind::SelectOption => tag == "option",
        ElementKind::Link => tag == "a",
        ElementKind::IFrame => tag == "iframe" || tag == "frame",
        ElementKind::Row => tag == "tr",
        ElementKind::Cell => tag == "th" || tag == "td",
        ElementKind::Generic => match selector_tag {
            Some(expected) => tag == expected.to_ascii_lowercase(),
            None => true,
        },
    };
    Ok(ok)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    #[tokio::test]
    async fn test_generic_without_tag_accepts_anything() {
        let driver = MockDriver::new();
        let node = driver.insert_node("span");
        assert!(
            validate(&driver, &node, ElementKind::Generic, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_generic_with_tag_filters() {
        let driver = MockDriver::new();
        let node = driver.insert_node("span");
        assert!(
            !validate(&driver, &node, ElementKind::Generic, Some("div"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_button_accepts_submit_input() {
        let driver = MockDriver::new();
        let node = driver.insert_node("input");
        driver.set_attribute(&node, "type", "SUBMIT");
        assert!(
            validate(&driver, &node, ElementKind::Button, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_button_rejects_text_input() {
        let driver = MockDriver::new();
        let node = driver.insert_node("input");
        driver.set_attribute(&node, "type", "text");
        assert!(
            !validate(&driver, &node, ElementKind::Button, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_cell_accepts_both_cell_tags() {
        let driver = MockDriver::new();
        let th = driver.insert_node("th");
        let td = driver.insert_node("td");
        assert!(validate(&driver, &th, ElementKind::Cell, None).await.unwrap());
        assert!(validate(&driver, &td, ElementKind::Cell, None).await.unwrap());
    }
}
