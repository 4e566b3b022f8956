//! Element kinds.
//!
//! Element subtypes form a closed set. The kind selects the normalization
//! and query-shaping rules a selector goes through, and decides which
//! preconditions are meaningful (only interactable kinds wait for enabled,
//! only editable kinds check read-only state).

// ============================================================================
// Constants
// ============================================================================

/// `input` types that behave as buttons.
pub const BUTTON_INPUT_TYPES: &[&str] = &["button", "reset", "submit", "image"];

/// `input` types that a text field can never be.
pub const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "button", "checkbox", "file", "hidden", "image", "radio", "reset", "submit",
];

// ============================================================================
// ElementKind
// ============================================================================

/// Closed set of element families with kind-specific locator rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Any element; no kind-specific rules.
    Generic,
    /// `<button>` or button-like `<input>`.
    Button,
    /// `<a>`.
    Link,
    /// Text-type `<input>`.
    TextField,
    /// `<textarea>`.
    TextArea,
    /// `<select>`.
    Select,
    /// `<option>`.
    SelectOption,
    /// `<input type="checkbox">`.
    Checkbox,
    /// `<input type="radio">`.
    Radio,
    /// `<iframe>`.
    IFrame,
    /// `<tr>`.
    Row,
    /// `<td>` or `<th>`.
    Cell,
}

impl ElementKind {
    /// Tag forced onto selectors of this kind, when the kind pins exactly
    /// one tag. Kinds with composite query shapes (Button, Row, Cell) and
    /// TextField handle their tags in the builder instead.
    pub(crate) fn forced_tag(self) -> Option<&'static str> {
        match self {
            Self::Link => Some("a"),
            Self::TextArea => Some("textarea"),
            Self::Select => Some("select"),
            Self::SelectOption => Some("option"),
            Self::Checkbox | Self::Radio => Some("input"),
            Self::IFrame => Some("iframe"),
            _ => None,
        }
    }

    /// `type` attribute implied by the kind.
    pub(crate) fn forced_type(self) -> Option<&'static str> {
        match self {
            Self::Checkbox => Some("checkbox"),
            Self::Radio => Some("radio"),
            _ => None,
        }
    }

    /// Kinds whose actions wait for the enabled state.
    pub(crate) fn interactable(self) -> bool {
        matches!(
            self,
            Self::Button
                | Self::TextField
                | Self::TextArea
                | Self::Select
                | Self::SelectOption
                | Self::Checkbox
                | Self::Radio
        )
    }

    /// Kinds for which read-only state applies.
    pub(crate) fn editable(self) -> bool {
        matches!(self, Self::TextField | Self::TextArea)
    }

    /// Kinds whose `text` locator matches the live value instead of the
    /// rendered node text.
    pub(crate) fn text_matches_value(self) -> bool {
        matches!(self, Self::TextField | Self::TextArea)
    }
}

// ============================================================================
// Tests
// ============================================================================
