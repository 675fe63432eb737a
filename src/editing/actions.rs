//! Edit actions over the working set.
//!
//! Each action snapshots the element it replaces or removes, so undo puts
//! back exactly what was there, including values that have no text form.

use dicom::core::header::Header;
use dicom::core::{Tag, VR};
use dicom::object::mem::InMemElement;

use super::history::EditAction;
use super::mutator;
use crate::error::{Error, Result};
use crate::model::{FileId, WorkingSet};
use crate::utils::{format_tag, value_text};

/// Replaces the value of one field in one file.
pub struct SetValueAction {
    file: FileId,
    tag: Tag,
    new_text: String,
    previous: Option<InMemElement>,
    description: String,
}

impl SetValueAction {
    pub fn new(file: FileId, tag: Tag, new_text: impl Into<String>) -> Self {
        Self {
            file,
            tag,
            new_text: new_text.into(),
            previous: None,
            description: format!("Edit {}", format_tag(tag)),
        }
    }
}

impl EditAction<WorkingSet> for SetValueAction {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, items: &mut WorkingSet) -> Result<()> {
        let item = items.item_mut(self.file, self.tag)?;
        let previous = item
            .record
            .element(self.tag)
            .map_err(|_| Error::NotFound(self.tag))?
            .clone();
        mutator::update_value(&mut item.record, self.tag, &self.new_text)?;
        item.mark_modified();
        self.previous = Some(previous);
        Ok(())
    }

    fn undo(&mut self, items: &mut WorkingSet) -> Result<()> {
        let item = items.item_mut(self.file, self.tag)?;
        if let Some(previous) = self.previous.clone() {
            mutator::restore_element(&mut item.record, previous);
            item.mark_reverted();
        }
        Ok(())
    }
}

/// Adds a new field to one file, or updates it if it already exists.
pub struct AddTagAction {
    file: FileId,
    tag: Tag,
    vr: VR,
    text: String,
    previous: Option<InMemElement>,
    description: String,
}

impl AddTagAction {
    pub fn new(file: FileId, tag: Tag, vr: VR, text: impl Into<String>) -> Self {
        Self {
            file,
            tag,
            vr,
            text: text.into(),
            previous: None,
            description: format!("Add {}", format_tag(tag)),
        }
    }
}

impl EditAction<WorkingSet> for AddTagAction {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, items: &mut WorkingSet) -> Result<()> {
        let item = items.item_mut(self.file, self.tag)?;
        let previous = item.record.element(self.tag).ok().cloned();
        mutator::add_or_restore(&mut item.record, self.tag, self.vr, &self.text)?;
        item.mark_modified();
        self.previous = previous;
        Ok(())
    }

    fn undo(&mut self, items: &mut WorkingSet) -> Result<()> {
        let item = items.item_mut(self.file, self.tag)?;
        match self.previous.clone() {
            Some(previous) => mutator::restore_element(&mut item.record, previous),
            None => {
                mutator::remove_tag(&mut item.record, self.tag)?;
            }
        }
        item.mark_reverted();
        Ok(())
    }
}

/// Removes one field from one file.
pub struct RemoveTagAction {
    file: FileId,
    tag: Tag,
    removed: Option<InMemElement>,
    description: String,
}

impl RemoveTagAction {
    pub fn new(file: FileId, tag: Tag) -> Self {
        Self {
            file,
            tag,
            removed: None,
            description: format!("Delete {}", format_tag(tag)),
        }
    }
}

impl EditAction<WorkingSet> for RemoveTagAction {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, items: &mut WorkingSet) -> Result<()> {
        let item = items.item_mut(self.file, self.tag)?;
        let removed = mutator::remove_tag(&mut item.record, self.tag)?;
        item.mark_modified();
        self.removed = Some(removed);
        Ok(())
    }

    fn undo(&mut self, items: &mut WorkingSet) -> Result<()> {
        let item = items.item_mut(self.file, self.tag)?;
        if let Some(removed) = self.removed.clone() {
            mutator::restore_element(&mut item.record, removed);
            item.mark_reverted();
        }
        Ok(())
    }
}

/// One successful change of a bulk apply.
#[derive(Debug, Clone)]
pub struct BulkChange {
    pub file: FileId,
    pub old_value: String,
    pub new_value: String,
    previous: InMemElement,
}

impl BulkChange {
    pub fn new(file: FileId, previous: InMemElement, new_value: impl Into<String>) -> Self {
        Self {
            file,
            old_value: value_text(previous.value()),
            new_value: new_value.into(),
            previous,
        }
    }
}

/// The same value written into many files, undone as one step.
pub struct BulkSetValueAction {
    tag: Tag,
    changes: Vec<BulkChange>,
    description: String,
}

impl BulkSetValueAction {
    pub fn new(tag: Tag, changes: Vec<BulkChange>) -> Self {
        let description = format!(
            "Set {} in {} file(s)",
            format_tag(tag),
            changes.len()
        );
        Self {
            tag,
            changes,
            description,
        }
    }

    pub fn changes(&self) -> &[BulkChange] {
        &self.changes
    }
}

impl EditAction<WorkingSet> for BulkSetValueAction {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, items: &mut WorkingSet) -> Result<()> {
        for (index, change) in self.changes.iter().enumerate() {
            let applied = items
                .item_mut(change.file, self.tag)
                .and_then(|item| {
                    mutator::update_value(&mut item.record, self.tag, &change.new_value)?;
                    item.mark_modified();
                    Ok(())
                });
            if let Err(err) = applied {
                for done in self.changes[..index].iter().rev() {
                    restore(items, done.file, done.previous.clone());
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&mut self, items: &mut WorkingSet) -> Result<()> {
        for change in self.changes.iter().rev() {
            let item = items.item_mut(change.file, self.tag)?;
            mutator::restore_element(&mut item.record, change.previous.clone());
            item.mark_reverted();
        }
        Ok(())
    }
}

/// One successful removal of a bulk delete.
#[derive(Debug, Clone)]
pub struct BulkRemoval {
    pub file: FileId,
    pub vr: VR,
    pub old_value: String,
    removed: InMemElement,
}

impl BulkRemoval {
    pub fn new(file: FileId, removed: InMemElement) -> Self {
        Self {
            file,
            vr: removed.vr(),
            old_value: value_text(removed.value()),
            removed,
        }
    }
}

/// The same field removed from many files, undone as one step.
pub struct BulkRemoveAction {
    tag: Tag,
    removals: Vec<BulkRemoval>,
    description: String,
}

impl BulkRemoveAction {
    pub fn new(tag: Tag, removals: Vec<BulkRemoval>) -> Self {
        let description = format!(
            "Delete {} from {} file(s)",
            format_tag(tag),
            removals.len()
        );
        Self {
            tag,
            removals,
            description,
        }
    }

    pub fn removals(&self) -> &[BulkRemoval] {
        &self.removals
    }
}

impl EditAction<WorkingSet> for BulkRemoveAction {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, items: &mut WorkingSet) -> Result<()> {
        for (index, removal) in self.removals.iter().enumerate() {
            let applied = items.item_mut(removal.file, self.tag).and_then(|item| {
                mutator::remove_tag(&mut item.record, self.tag)?;
                item.mark_modified();
                Ok(())
            });
            if let Err(err) = applied {
                for done in self.removals[..index].iter().rev() {
                    restore(items, done.file, done.removed.clone());
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&mut self, items: &mut WorkingSet) -> Result<()> {
        for removal in self.removals.iter().rev() {
            let item = items.item_mut(removal.file, self.tag)?;
            mutator::restore_element(&mut item.record, removal.removed.clone());
            item.mark_reverted();
        }
        Ok(())
    }
}

fn restore(items: &mut WorkingSet, file: FileId, element: InMemElement) {
    if let Some(item) = items.get_mut(file) {
        mutator::restore_element(&mut item.record, element);
        item.mark_reverted();
    }
}
