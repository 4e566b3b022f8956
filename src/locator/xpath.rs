//! XPath query construction.
//!
//! Turns a normalized selector into a single XPath expression plus a list
//! of residual predicates the runtime must evaluate itself. String values
//! become exact XPath comparisons; patterns are pushed into the query as
//! `contains()` prefilters where their literal structure allows, and kept
//! as residual filters otherwise.
//!
//! ## Pattern convertibility
//!
//! | Pattern shape                     | Query contribution          | Residual |
//! |-----------------------------------|-----------------------------|----------|
//! | plain literal (`draft`)           | `contains(lhs, 'draft')`    | yes      |
//! | partial literals (`^item-\d+$`)   | `contains(lhs, 'item-')`    | yes      |
//! | opaque (`(a|b)`, case-insensitive)| none                        | yes      |
//!
//! A residual filter always accompanies a converted pattern so the coarse
//! `contains()` prefilter can never admit a false match.

// ============================================================================
// Imports
// ============================================================================

use crate::driver::Query;
use crate::element::kind::{BUTTON_INPUT_TYPES, ElementKind, NON_TEXT_INPUT_TYPES};
use crate::error::{Error, Result};
use crate::locator::normalizer::Normalized;
use crate::selector::{Pattern, SelectorKey, SelectorValue};

// ============================================================================
// Built Query
// ============================================================================

/// What the runtime matches a residual predicate against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResidualTarget {
    /// A named attribute, `None` when absent.
    Attribute(String),
    /// Visible text content.
    Text,
    /// The `value` attribute.
    Value,
    /// Visible text, falling back to the `value` attribute.
    TextOrValue,
    /// Lowercased tag name.
    TagName,
    /// Computed visibility.
    Visibility,
    /// Label text of any option under a select list.
    OptionLabel,
    /// Text of an associated `<label>`, wrapping or linked via `for`.
    LabelText,
}

/// How a residual predicate decides a match.
#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    /// Exact string equality.
    Literal(String),
    /// Full regex match.
    Pattern(Pattern),
    /// Presence (`true`) or absence (`false`); for `Visibility` the
    /// required displayed state.
    Bool(bool),
}

/// One post-query filter the locator applies to each candidate.
#[derive(Debug, Clone)]
pub(crate) struct ResidualPredicate {
    pub target: ResidualTarget,
    pub matcher: Matcher,
}

/// A built query plus whatever could not be expressed in XPath.
#[derive(Debug, Clone)]
pub(crate) struct Built {
    pub query: Query,
    pub residual: Vec<ResidualPredicate>,
    /// Index left for the runtime to apply after residual filtering.
    pub index: Option<i64>,
}

// ============================================================================
// Escaping
// ============================================================================

/// Embeds an arbitrary string as an XPath 1.0 string literal. Values
/// containing both quote kinds need `concat()`.
pub(crate) fn escape(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

// ============================================================================
// Pattern Analysis
// ============================================================================

/// How much of a regex source survives as XPath `contains()` prefilters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Convertibility {
    /// The whole source is a literal; one `contains()` suffices.
    Pure(String),
    /// Literal runs worth prefiltering on, in source order.
    Partial(Vec<String>),
    /// Nothing usable; match entirely at runtime.
    Opaque,
}

const META: &[char] = &[
    '\\', '^', '$', '.', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}',
];

/// Extracts literal runs from a regex source. Alternation poisons the
/// whole pattern since no single run is guaranteed to appear.
pub(crate) fn analyze(source: &str) -> Convertibility {
    if source.is_empty() || source.contains('|') {
        return Convertibility::Opaque;
    }
    if !source.contains(META) {
        return Convertibility::Pure(source.to_string());
    }

    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            // An escape may mean a class or a literal; treating it as a
            // break keeps the prefilter conservative.
            chars.next();
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else if META.contains(&c) {
            // Quantifiers bind to the previous char, which may repeat
            // zero times, so it cannot be part of a guaranteed run.
            if matches!(c, '?' | '*' | '{') && !current.is_empty() {
                current.pop();
            }
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    let runs: Vec<String> = runs.into_iter().filter(|r| r.len() >= 2).collect();
    if runs.is_empty() {
        Convertibility::Opaque
    } else {
        Convertibility::Partial(runs)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds an XPath query for the selector, dispatching on element kind.
/// `scope_tag` is the tag of the scoping element, used by row queries.
pub(crate) fn build(
    normalized: &Normalized,
    kind: ElementKind,
    scope_tag: Option<&str>,
) -> Result<Built> {
    match kind {
        ElementKind::Button if normalized.adjacent.is_none() => build_button(normalized),
        ElementKind::TextField if normalized.adjacent.is_none() => build_text_field(normalized),
        ElementKind::Select if normalized.adjacent.is_none() => build_select(normalized),
        ElementKind::Row => build_row(normalized, scope_tag),
        ElementKind::Cell => build_cell(normalized),
        _ => build_generic(normalized, kind.text_matches_value()),
    }
}

struct Parts {
    predicates: Vec<String>,
    residual: Vec<ResidualPredicate>,
}

impl Parts {
    fn new() -> Self {
        Parts {
            predicates: Vec::new(),
            residual: Vec::new(),
        }
    }

    fn suffix(&self) -> String {
        self.predicates
            .iter()
            .map(|p| format!("[{p}]"))
            .collect::<String>()
    }
}

fn build_generic(normalized: &Normalized, text_matches_value: bool) -> Result<Built> {
    let start = match normalized.adjacent {
        Some(adjacent) => adjacent.axis().to_string(),
        None => ".//*".to_string(),
    };

    let mut parts = Parts::new();
    for (key, value) in &normalized.pairs {
        // User-editable elements surface their content through `value`,
        // not text nodes.
        if text_matches_value && *key == SelectorKey::Text {
            match value {
                SelectorValue::Str(s) => parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::Value,
                    matcher: Matcher::Literal(s.clone()),
                }),
                SelectorValue::Pattern(p) => parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::Value,
                    matcher: Matcher::Pattern(p.clone()),
                }),
                other => {
                    return Err(Error::invalid_selector(format!(
                        "expected a string or pattern for text, got {other}"
                    )));
                }
            }
            continue;
        }
        add_pair(&mut parts, key, value)?;
    }

    let expression = format!("{start}{}", parts.suffix());
    finish(expression, parts.residual, normalized)
}

fn build_button(normalized: &Normalized) -> Result<Built> {
    let mut parts = Parts::new();
    let mut type_value: Option<&SelectorValue> = None;

    for (key, value) in &normalized.pairs {
        match key {
            SelectorKey::TagName => {}
            SelectorKey::Attribute(name) if name == "type" => type_value = Some(value),
            SelectorKey::Attribute(name) if name == "value" => match value {
                // `value` matches either caption text or the value
                // attribute, whichever the markup uses.
                SelectorValue::Str(s) => {
                    let lit = escape(s);
                    parts
                        .predicates
                        .push(format!("(normalize-space()={lit} or @value={lit})"));
                }
                SelectorValue::Pattern(p) => {
                    add_pattern_predicate(&mut parts, ResidualTarget::TextOrValue, "normalize-space()", p);
                }
                other => {
                    return Err(Error::invalid_selector(format!(
                        "expected a string or pattern for value, got {other}"
                    )));
                }
            },
            _ => add_pair(&mut parts, key, value)?,
        }
    }

    let suffix = parts.suffix();
    let input_types = BUTTON_INPUT_TYPES
        .iter()
        .map(|t| format!("translate(@type,'ABCDEFGHIJKLMNOPQRSTUVWXYZ','abcdefghijklmnopqrstuvwxyz')={}", escape(t)))
        .collect::<Vec<_>>()
        .join(" or ");

    let expression = match type_value {
        // type: true restricts to input buttons; type: false to <button>.
        Some(SelectorValue::Bool(true)) => {
            format!(".//*[local-name()='input'][{input_types}]{suffix}")
        }
        Some(SelectorValue::Bool(false)) => {
            format!(".//*[local-name()='button']{suffix}")
        }
        Some(SelectorValue::Str(t)) => {
            let pred = format!(
                "translate(@type,'ABCDEFGHIJKLMNOPQRSTUVWXYZ','abcdefghijklmnopqrstuvwxyz')={}",
                escape(&t.to_ascii_lowercase())
            );
            format!(
                "(.//*[local-name()='button'][{pred}]{suffix} | .//*[local-name()='input'][{pred}]{suffix})"
            )
        }
        _ => format!(
            "(.//*[local-name()='button']{suffix} | .//*[local-name()='input'][{input_types}]{suffix})"
        ),
    };

    finish(expression, parts.residual, normalized)
}

/// Select lists match `text`/`label` against their option labels, which
/// only the runtime can walk.
fn build_select(normalized: &Normalized) -> Result<Built> {
    let mut parts = Parts::new();
    for (key, value) in &normalized.pairs {
        match key {
            SelectorKey::Text | SelectorKey::Label => match value {
                SelectorValue::Str(s) => parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::OptionLabel,
                    matcher: Matcher::Literal(s.clone()),
                }),
                SelectorValue::Pattern(p) => parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::OptionLabel,
                    matcher: Matcher::Pattern(p.clone()),
                }),
                other => {
                    return Err(Error::invalid_selector(format!(
                        "expected a string or pattern for {key}, got {other}"
                    )));
                }
            },
            _ => add_pair(&mut parts, key, value)?,
        }
    }

    let expression = format!(".//*{}", parts.suffix());
    finish(expression, parts.residual, normalized)
}

fn build_text_field(normalized: &Normalized) -> Result<Built> {
    let mut parts = Parts::new();
    let mut type_value: Option<&SelectorValue> = None;

    for (key, value) in &normalized.pairs {
        match key {
            SelectorKey::TagName => {}
            SelectorKey::Attribute(name) if name == "type" => type_value = Some(value),
            // Text fields surface their content through `value`, not text
            // nodes, so text matching happens at runtime.
            SelectorKey::Text => match value {
                SelectorValue::Str(s) => parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::Value,
                    matcher: Matcher::Literal(s.clone()),
                }),
                SelectorValue::Pattern(p) => parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::Value,
                    matcher: Matcher::Pattern(p.clone()),
                }),
                other => {
                    return Err(Error::invalid_selector(format!(
                        "expected a string or pattern for text, got {other}"
                    )));
                }
            },
            _ => add_pair(&mut parts, key, value)?,
        }
    }

    let lowered = "translate(@type,'ABCDEFGHIJKLMNOPQRSTUVWXYZ','abcdefghijklmnopqrstuvwxyz')";
    let negative: Vec<String> = NON_TEXT_INPUT_TYPES
        .iter()
        .map(|t| format!("{lowered}!={}", escape(t)))
        .collect();
    let negative = negative.join(" and ");

    let type_predicate = match type_value {
        None | Some(SelectorValue::Bool(true)) => format!("(not(@type) or ({negative}))"),
        Some(SelectorValue::Str(t)) => {
            let t = t.to_ascii_lowercase();
            if NON_TEXT_INPUT_TYPES.contains(&t.as_str()) {
                return Err(Error::locator(format!(
                    "text fields cannot be located by type: {t}"
                )));
            }
            format!("{lowered}={}", escape(&t))
        }
        Some(other) => {
            return Err(Error::invalid_selector(format!(
                "expected a string for type, got {other}"
            )));
        }
    };

    let expression = format!(
        ".//*[local-name()='input'][{type_predicate}]{}",
        parts.suffix()
    );
    finish(expression, parts.residual, normalized)
}

fn build_row(normalized: &Normalized, scope_tag: Option<&str>) -> Result<Built> {
    let mut parts = Parts::new();
    for (key, value) in &normalized.pairs {
        if *key == SelectorKey::TagName {
            continue;
        }
        add_pair(&mut parts, key, value)?;
    }
    let suffix = parts.suffix();

    // Rows scoped to a table must also look through its section elements;
    // rows scoped to a section must not, or they would match twice.
    let mut exprs = vec![format!("./*[local-name()='tr']{suffix}")];
    if !matches!(scope_tag, Some("tbody") | Some("thead") | Some("tfoot")) {
        for section in ["tbody", "thead", "tfoot"] {
            exprs.push(format!(
                "./*[local-name()='{section}']/*[local-name()='tr']{suffix}"
            ));
        }
    }

    let expression = if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        format!("({})", exprs.join(" | "))
    };
    finish(expression, parts.residual, normalized)
}

fn build_cell(normalized: &Normalized) -> Result<Built> {
    let mut parts = Parts::new();
    for (key, value) in &normalized.pairs {
        if *key == SelectorKey::TagName {
            continue;
        }
        add_pair(&mut parts, key, value)?;
    }
    let suffix = parts.suffix();
    let expression = format!(
        "(./*[local-name()='th']{suffix} | ./*[local-name()='td']{suffix})"
    );
    finish(expression, parts.residual, normalized)
}

fn finish(
    expression: String,
    residual: Vec<ResidualPredicate>,
    normalized: &Normalized,
) -> Result<Built> {
    let mut expression = expression;
    let mut index = normalized.index;

    // A positive index folds into the query only when nothing remains to
    // filter afterwards; otherwise it must wait for the runtime.
    if let Some(i) = index {
        if i > 0 && residual.is_empty() {
            expression = format!("({expression})[{}]", i + 1);
            index = None;
        } else if i == 0 {
            // Index zero is the default first match.
            index = None;
        }
    }

    Ok(Built {
        query: Query::xpath(expression),
        residual,
        index,
    })
}

// ============================================================================
// Per-Key Predicates
// ============================================================================

fn add_pair(parts: &mut Parts, key: &SelectorKey, value: &SelectorValue) -> Result<()> {
    match key {
        SelectorKey::Visible => {
            if let SelectorValue::Bool(b) = value {
                parts.residual.push(ResidualPredicate {
                    target: ResidualTarget::Visibility,
                    matcher: Matcher::Bool(*b),
                });
            }
            Ok(())
        }
        SelectorKey::Class => add_class(parts, value),
        SelectorKey::Label => add_label(parts, value),
        SelectorKey::TagName => add_single(parts, key, value),
        _ => match value {
            SelectorValue::Any(values) => {
                let mut sub = Parts::new();
                for v in values {
                    add_single(&mut sub, key, v)?;
                }
                if !sub.residual.is_empty() {
                    return Err(Error::invalid_selector(format!(
                        "multiple values for {key} must all be exact strings"
                    )));
                }
                parts.predicates.push(sub.predicates.join(" or "));
                Ok(())
            }
            _ => add_single(parts, key, value),
        },
    }
}

fn add_single(parts: &mut Parts, key: &SelectorKey, value: &SelectorValue) -> Result<()> {
    match key {
        SelectorKey::TagName => match value {
            SelectorValue::Str(tag) => {
                parts
                    .predicates
                    .push(format!("local-name()={}", escape(tag)));
                Ok(())
            }
            SelectorValue::Pattern(p) => {
                add_pattern_predicate(parts, ResidualTarget::TagName, "local-name()", p);
                Ok(())
            }
            other => Err(Error::invalid_selector(format!(
                "expected a string or pattern for tag_name, got {other}"
            ))),
        },
        SelectorKey::Text => match value {
            SelectorValue::Str(s) => {
                parts
                    .predicates
                    .push(format!("normalize-space()={}", escape(s)));
                Ok(())
            }
            SelectorValue::Pattern(p) => {
                add_pattern_predicate(parts, ResidualTarget::Text, "normalize-space()", p);
                Ok(())
            }
            other => Err(Error::invalid_selector(format!(
                "expected a string or pattern for text, got {other}"
            ))),
        },
        SelectorKey::Id => add_attribute(parts, "id", value),
        SelectorKey::Name => add_attribute(parts, "name", value),
        SelectorKey::Attribute(name) => add_attribute(parts, name, value),
        _ => Err(Error::invalid_selector(format!(
            "unsupported selector key: {key}"
        ))),
    }
}

fn add_attribute(parts: &mut Parts, name: &str, value: &SelectorValue) -> Result<()> {
    let name = name.replace('_', "-");
    // `href` is compared whitespace-normalized; `type` case-insensitively.
    let lhs = match name.as_str() {
        "href" => "normalize-space(@href)".to_string(),
        "type" => {
            "translate(@type,'ABCDEFGHIJKLMNOPQRSTUVWXYZ','abcdefghijklmnopqrstuvwxyz')".to_string()
        }
        _ => format!("@{name}"),
    };

    match value {
        SelectorValue::Str(s) => {
            let s = if name == "type" {
                s.to_ascii_lowercase()
            } else {
                s.clone()
            };
            parts.predicates.push(format!("{lhs}={}", escape(&s)));
        }
        SelectorValue::Bool(true) => parts.predicates.push(format!("@{name}")),
        SelectorValue::Bool(false) => parts.predicates.push(format!("not(@{name})")),
        SelectorValue::Pattern(p) => {
            add_pattern_predicate(parts, ResidualTarget::Attribute(name.clone()), &lhs, p);
        }
        SelectorValue::Any(_) => {
            return Err(Error::invalid_selector(format!(
                "nested value lists are not supported for {name}"
            )));
        }
    }
    Ok(())
}

/// Class values match whole class-list tokens. A leading `!` on a string
/// token negates it.
fn add_class(parts: &mut Parts, value: &SelectorValue) -> Result<()> {
    let tokens: Vec<&SelectorValue> = match value {
        SelectorValue::Any(values) => values.iter().collect(),
        single => vec![single],
    };

    for token in tokens {
        match token {
            SelectorValue::Str(s) => {
                let (negated, name) = match s.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, s.as_str()),
                };
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(Error::invalid_selector(format!(
                        "class tokens cannot be empty or contain whitespace: {s:?}"
                    )));
                }
                let padded = escape(&format!(" {name} "));
                let contains = format!("contains(concat(' ', @class, ' '), {padded})");
                parts.predicates.push(if negated {
                    format!("not({contains})")
                } else {
                    contains
                });
            }
            SelectorValue::Bool(true) => parts.predicates.push("@class".to_string()),
            SelectorValue::Bool(false) => parts.predicates.push("not(@class)".to_string()),
            SelectorValue::Pattern(p) => {
                add_pattern_predicate(parts, ResidualTarget::Attribute("class".into()), "@class", p);
            }
            SelectorValue::Any(_) => {
                return Err(Error::invalid_selector(
                    "nested class lists are not supported".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// `label` matches through an associated `<label>`: either via `for`/`id`
/// linkage or by being wrapped in the label element.
fn add_label(parts: &mut Parts, value: &SelectorValue) -> Result<()> {
    match value {
        SelectorValue::Str(s) => {
            let lit = escape(s);
            parts.predicates.push(format!(
                "(@id=//*[local-name()='label'][normalize-space()={lit}]/@for \
                 or parent::*[local-name()='label'][normalize-space()={lit}])"
            ));
            Ok(())
        }
        SelectorValue::Pattern(p) => {
            // Pattern labels cannot prefilter; the runtime walks the
            // associated label elements.
            parts.residual.push(ResidualPredicate {
                target: ResidualTarget::LabelText,
                matcher: Matcher::Pattern(p.clone()),
            });
            Ok(())
        }
        other => Err(Error::invalid_selector(format!(
            "expected a string or pattern for label, got {other}"
        ))),
    }
}

fn add_pattern_predicate(parts: &mut Parts, target: ResidualTarget, lhs: &str, pattern: &Pattern) {
    if !pattern.is_case_insensitive() {
        match analyze(pattern.source()) {
            Convertibility::Pure(lit) => {
                parts
                    .predicates
                    .push(format!("contains({lhs}, {})", escape(&lit)));
            }
            Convertibility::Partial(runs) => {
                for run in runs {
                    parts
                        .predicates
                        .push(format!("contains({lhs}, {})", escape(&run)));
                }
            }
            Convertibility::Opaque => {}
        }
    }
    parts.residual.push(ResidualPredicate {
        target,
        matcher: Matcher::Pattern(pattern.clone()),
    });
}

// ============================================================================
// Tests
// ============================================================================
