//! Read-only quality checks for a transformed layout.
//!
//! Validation never blocks a transform; callers decide what to do with the
//! report.

use serde::{Deserialize, Serialize};

use crate::{Element, LayoutContext};

/// Validator thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// Smallest renderable width or height.
    pub min_size: f32,
    /// Smallest readable font size.
    pub min_font_size: f32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_size: 10.0,
            min_font_size: 12.0,
        }
    }
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// Element extends past the canvas edges.
    OutOfBounds,
    /// Element is too small to render meaningfully.
    TooSmall,
    /// Text is too small to read.
    UnreadableText,
    /// Two critical elements overlap.
    CriticalOverlap,
}

/// One problem found by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Issue category.
    pub kind: IssueKind,
    /// Elements involved.
    pub element_ids: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True iff `issues` is empty.
    pub is_valid: bool,
    /// Problems found.
    pub issues: Vec<ValidationIssue>,
    /// One suggestion per issue.
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    fn push(&mut self, kind: IssueKind, ids: Vec<String>, message: String, suggestion: String) {
        self.issues.push(ValidationIssue {
            kind,
            element_ids: ids,
            message,
        });
        self.suggestions.push(suggestion);
    }

    /// Issues of one kind.
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }
}

/// Validate with default thresholds.
#[must_use]
pub fn validate(elements: &[Element], context: &LayoutContext) -> ValidationReport {
    validate_with(elements, context, &ValidatorConfig::default())
}

/// Validate with explicit thresholds. Hidden elements are not checked.
#[must_use]
pub fn validate_with(
    elements: &[Element],
    context: &LayoutContext,
    config: &ValidatorConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let (cw, ch) = (context.container_width, context.container_height);
    let visible: Vec<&Element> = elements.iter().filter(|e| e.visible).collect();

    for element in &visible {
        let id = element.id.to_string();
        let b = &element.bounds;

        if !b.is_within(cw, ch) {
            report.push(
                IssueKind::OutOfBounds,
                vec![id.clone()],
                format!(
                    "Element {id} at ({}, {}) {}x{} is outside the {cw}x{ch} canvas",
                    b.x, b.y, b.width, b.height
                ),
                format!("Move or resize {id} so it fits inside the canvas"),
            );
        }

        if b.width < config.min_size || b.height < config.min_size {
            report.push(
                IssueKind::TooSmall,
                vec![id.clone()],
                format!("Element {id} is {}x{}, too small to render", b.width, b.height),
                format!(
                    "Make {id} at least {}x{} pixels",
                    config.min_size, config.min_size
                ),
            );
        }

        if element.is_text() {
            if let Some(size) = element.font_size.filter(|s| *s < config.min_font_size) {
                report.push(
                    IssueKind::UnreadableText,
                    vec![id.clone()],
                    format!("Text {id} uses font size {size}, which is hard to read"),
                    format!(
                        "Increase the font size of {id} to at least {}",
                        config.min_font_size
                    ),
                );
            }
        }
    }

    let critical: Vec<&Element> = visible
        .iter()
        .copied()
        .filter(|e| e.role.is_critical())
        .collect();
    for (i, a) in critical.iter().enumerate() {
        for b in &critical[i + 1..] {
            if a.bounds.intersects(&b.bounds) {
                report.push(
                    IssueKind::CriticalOverlap,
                    vec![a.id.to_string(), b.id.to_string()],
                    format!("Critical elements {} and {} overlap", a.id, b.id),
                    format!("Separate {} and {} so both stay legible", a.id, b.id),
                );
            }
        }
    }

    report.is_valid = report.issues.is_empty();
    tracing::debug!(
        "Validated {} elements for {}: {} issues",
        elements.len(),
        context.format_key(),
        report.issues.len()
    );
    report
}
