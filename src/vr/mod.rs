//! Value representation checks applied to proposed tag text before it is
//! written into a dataset.
//!
//! Validation runs in two stages for every value component: the VR's
//! maximum length first, then its semantic check. Multi-valued VRs split
//! the text on `\` and report the 1-based index of the failing component.

pub mod rules;

use dicom::core::{Tag, VR};

use crate::utils::format_tag;
pub use rules::{rule_for, Finding, NativeKind, VrRule};

pub const VALUE_SEPARATOR: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    None,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub severity: Severity,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            severity: Severity::None,
            message: String::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Validates `text` as the value of `tag` with representation `vr`.
///
/// Empty text is always valid. Unknown VRs pass without a semantic check.
pub fn validate(tag: Tag, vr: VR, text: &str) -> ValidationResult {
    if text.is_empty() {
        return ValidationResult::ok();
    }
    let Some(rule) = rule_for(vr) else {
        return ValidationResult::ok();
    };

    log::trace!("Validating {} as {}", format_tag(tag), vr.to_string());

    if !(rule.multi_valued && text.contains(VALUE_SEPARATOR)) {
        return validate_component(rule, text);
    }

    let mut warning = None;
    for (index, component) in text.split(VALUE_SEPARATOR).enumerate() {
        let result = validate_component(rule, component);
        match result.severity {
            Severity::Error => {
                return ValidationResult::error(format!("Value {}: {}", index + 1, result.message))
            }
            Severity::Warning if warning.is_none() => {
                warning = Some(format!("Value {}: {}", index + 1, result.message));
            }
            _ => {}
        }
    }

    match warning {
        Some(message) => ValidationResult::warning(message),
        None => ValidationResult::ok(),
    }
}

fn validate_component(rule: &VrRule, component: &str) -> ValidationResult {
    if component.is_empty() {
        return ValidationResult::ok();
    }

    if let Some(max_len) = rule.max_len {
        let length = component.chars().count();
        if length > max_len {
            return ValidationResult::error(format!(
                "Value exceeds maximum length of {max_len} characters for {} (got {length})",
                rule.vr.to_string()
            ));
        }
    }

    let Some(check) = rule.check else {
        return ValidationResult::ok();
    };

    // trailing space is DICOM padding and never significant
    match check(component.trim_end_matches(' ')) {
        Finding::Ok => ValidationResult::ok(),
        Finding::Warning(message) => ValidationResult::warning(message),
        Finding::Error(message) => ValidationResult::error(message),
    }
}

/// Whether fields of this VR accept free-text replacement.
pub fn is_text_editable(vr: VR) -> bool {
    rule_for(vr).is_none_or(|rule| rule.native.is_text_editable())
}
