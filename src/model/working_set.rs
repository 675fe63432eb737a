use dicom::core::Tag;

use super::FileItem;
use crate::error::{Error, Result};

/// Position of a [`FileItem`] inside the [`WorkingSet`]. Positions stay
/// valid until the working set is replaced wholesale.
pub type FileId = usize;

/// The loaded files, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    items: Vec<FileItem>,
}

impl WorkingSet {
    pub fn new(items: Vec<FileItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: FileId) -> Option<&FileItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: FileId) -> Option<&mut FileItem> {
        self.items.get_mut(id)
    }

    /// Like [`WorkingSet::get_mut`], for callers that hold an id captured
    /// from this same working set.
    pub(crate) fn item_mut(&mut self, id: FileId, tag: Tag) -> Result<&mut FileItem> {
        self.items.get_mut(id).ok_or(Error::NotFound(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FileItem> {
        self.items.iter_mut()
    }

    pub fn modified_count(&self) -> usize {
        self.items.iter().filter(|item| item.modified).count()
    }

    pub fn into_items(self) -> Vec<FileItem> {
        self.items
    }
}

impl From<Vec<FileItem>> for WorkingSet {
    fn from(items: Vec<FileItem>) -> Self {
        Self::new(items)
    }
}
