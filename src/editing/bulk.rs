//! Applying one edit to every file of the working set.
//!
//! Records are processed one at a time in working-set order. A failure on
//! one record is reported and the loop moves on; only cancellation stops it
//! early. Whatever was applied, including before a cancellation, is
//! registered on the history as a single already-executed action.

use dicom::core::header::Header;
use dicom::core::value::Value;
use dicom::core::Tag;
use dicom::object::mem::InMemElement;

use super::actions::{BulkChange, BulkRemoval, BulkRemoveAction, BulkSetValueAction};
use super::history::{EditAction, History};
use super::mutator;
use crate::error::Error;
use crate::model::WorkingSet;
use crate::task::{CancellationToken, Progress};
use crate::utils::format_tag;
use crate::vr::VALUE_SEPARATOR;

/// Outcome of a bulk apply or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    /// Records that were changed and are covered by the registered action.
    pub changed: usize,
    /// Records left alone: value already equal, or tag absent on delete.
    pub skipped: usize,
    /// Every per-record failure as `"{file name}: {message}"`, uncapped.
    pub errors: Vec<String>,
    pub cancelled: bool,
    /// Description of the action pushed onto the history, if any.
    pub action: Option<String>,
}

/// Sets `tag` to `value` in every item that has the tag.
pub fn apply_to_all(
    items: &mut WorkingSet,
    history: &mut History<WorkingSet>,
    tag: Tag,
    value: &str,
    progress: &mut dyn FnMut(Progress),
    cancel: &CancellationToken,
) -> BulkOutcome {
    let total = items.len();
    let mut report = BulkOutcome::default();
    let mut changes = Vec::new();
    log::info!("Applying {} = {value:?} to {total} file(s)", format_tag(tag));

    for (file, item) in items.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let name = item.file_name();
        match item.record.element(tag).ok().cloned() {
            Some(previous) if holds_value(&previous, tag, value) => {
                report.skipped += 1;
            }
            Some(previous) => match mutator::update_value(&mut item.record, tag, value) {
                Ok(()) => {
                    item.mark_modified();
                    changes.push(BulkChange::new(file, previous, value));
                }
                Err(err) => record_failure(&mut report, &name, &err),
            },
            None => record_failure(&mut report, &name, &Error::NotFound(tag)),
        }

        progress(Progress::new(
            file + 1,
            total,
            format!("Processed {name} ({}/{total})", file + 1),
        ));
    }

    report.changed = changes.len();
    if !changes.is_empty() {
        let action = BulkSetValueAction::new(tag, changes);
        report.action = Some(action.description().to_string());
        history.push_executed(Box::new(action));
    }
    log_summary("Apply", tag, &report);
    report
}

/// Removes `tag` from every item that has it.
pub fn delete_from_all(
    items: &mut WorkingSet,
    history: &mut History<WorkingSet>,
    tag: Tag,
    progress: &mut dyn FnMut(Progress),
    cancel: &CancellationToken,
) -> BulkOutcome {
    let total = items.len();
    let mut report = BulkOutcome::default();
    let mut removals = Vec::new();
    log::info!("Deleting {} from {total} file(s)", format_tag(tag));

    for (file, item) in items.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let name = item.file_name();
        if item.has_tag(tag) {
            match mutator::remove_tag(&mut item.record, tag) {
                Ok(removed) => {
                    item.mark_modified();
                    removals.push(BulkRemoval::new(file, removed));
                }
                Err(err) => record_failure(&mut report, &name, &err),
            }
        } else {
            report.skipped += 1;
        }

        progress(Progress::new(
            file + 1,
            total,
            format!("Processed {name} ({}/{total})", file + 1),
        ));
    }

    report.changed = removals.len();
    if !removals.is_empty() {
        let action = BulkRemoveAction::new(tag, removals);
        report.action = Some(action.description().to_string());
        history.push_executed(Box::new(action));
    }
    log_summary("Delete", tag, &report);
    report
}

/// Whether writing `text` would leave the field as it is. Both sides go
/// through native conversion, so `0512` matches a stored 512 and padding
/// is not a difference.
fn holds_value(current: &InMemElement, tag: Tag, text: &str) -> bool {
    let Value::Primitive(stored) = current.value() else {
        return false;
    };
    match mutator::to_native(tag, current.vr(), text) {
        Ok(target) => normalized(&target.to_str()) == normalized(&stored.to_str()),
        Err(_) => false,
    }
}

fn normalized(text: &str) -> String {
    text.split(VALUE_SEPARATOR)
        .map(|component| component.trim_end_matches(['\0', ' ']))
        .collect::<Vec<_>>()
        .join("\\")
}

fn record_failure(report: &mut BulkOutcome, name: &str, err: &Error) {
    log::warn!("{name}: {err}");
    report.errors.push(format!("{name}: {err}"));
}

fn log_summary(operation: &str, tag: Tag, report: &BulkOutcome) {
    log::info!(
        "{operation} {}: {} changed, {} skipped, {} failed{}",
        format_tag(tag),
        report.changed,
        report.skipped,
        report.errors.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
}
