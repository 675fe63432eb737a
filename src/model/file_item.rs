use dicom::core::Tag;
use dicom::object::meta::{FileMetaTable, FileMetaTableBuilder};
use dicom::object::{DefaultDicomObject, InMemDicomObject};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};

const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// Commonly displayed values, cached so list views never walk the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub patient_name: String,
    pub patient_id: String,
    pub study_date: String,
    pub modality: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub sop_instance_uid: String,
}

impl FileSummary {
    pub fn from_record(record: &InMemDicomObject) -> Self {
        Self {
            patient_name: attribute_text(record, "PatientName").unwrap_or_default(),
            patient_id: attribute_text(record, "PatientID").unwrap_or_else(unknown),
            study_date: attribute_text(record, "StudyDate").unwrap_or_default(),
            modality: attribute_text(record, "Modality").unwrap_or_default(),
            study_instance_uid: attribute_text(record, "StudyInstanceUID")
                .unwrap_or_else(unknown),
            series_instance_uid: attribute_text(record, "SeriesInstanceUID")
                .unwrap_or_else(unknown),
            sop_instance_uid: attribute_text(record, "SOPInstanceUID").unwrap_or_else(unknown),
        }
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

/// One DICOM file of the working set: the dataset it owns plus file
/// metadata and the unsaved-changes flag.
#[derive(Debug, Clone)]
pub struct FileItem {
    pub path: PathBuf,
    pub size: u64,
    pub modified_at: Option<SystemTime>,
    pub record: InMemDicomObject,
    pub meta: Option<FileMetaTable>,
    pub summary: FileSummary,
    /// Whether the record differs from what was last loaded or saved.
    pub modified: bool,
    /// Edits applied minus edits undone since the last load or save.
    pending_edits: i64,
}

impl FileItem {
    /// Wraps a dataset that has no backing file yet.
    pub fn new(path: impl Into<PathBuf>, record: InMemDicomObject) -> Self {
        let summary = FileSummary::from_record(&record);
        Self {
            path: path.into(),
            size: 0,
            modified_at: None,
            record,
            meta: None,
            summary,
            modified: false,
            pending_edits: 0,
        }
    }

    pub fn from_file_object(path: impl Into<PathBuf>, object: DefaultDicomObject) -> Self {
        let path = path.into();
        let (size, modified_at) = file_stats(&path);
        let meta = object.meta().clone();
        let record = object.into_inner();
        let summary = FileSummary::from_record(&record);
        Self {
            path,
            size,
            modified_at,
            record,
            meta: Some(meta),
            summary,
            modified: false,
            pending_edits: 0,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Records one applied edit and refreshes cached values.
    pub fn mark_modified(&mut self) {
        self.pending_edits += 1;
        self.refresh();
    }

    /// Records one undone edit. Undoing back to the loaded or saved state
    /// clears the modified flag again.
    pub fn mark_reverted(&mut self) {
        self.pending_edits -= 1;
        self.refresh();
    }

    /// Called after a successful write to disk.
    pub fn mark_saved(&mut self) {
        self.pending_edits = 0;
        self.modified = false;
        let (size, modified_at) = file_stats(&self.path);
        self.size = size;
        self.modified_at = modified_at;
    }

    fn refresh(&mut self) {
        self.modified = self.pending_edits != 0;
        self.summary = FileSummary::from_record(&self.record);
    }

    /// Builds the file object to serialize. A loaded item keeps its file
    /// meta group, with the media storage UIDs following the dataset.
    pub fn to_file_object(&self) -> Result<DefaultDicomObject> {
        let sop_class = attribute_text(&self.record, "SOPClassUID");
        let sop_instance = attribute_text(&self.record, "SOPInstanceUID");

        match &self.meta {
            Some(meta)
                if same_uid(sop_class.as_deref(), &meta.media_storage_sop_class_uid)
                    && same_uid(sop_instance.as_deref(), &meta.media_storage_sop_instance_uid) =>
            {
                Ok(self.record.clone().with_exact_meta(meta.clone()))
            }
            Some(meta) => {
                let mut builder = FileMetaTableBuilder::new()
                    .information_version(meta.information_version)
                    .media_storage_sop_class_uid(sop_class.unwrap_or_else(|| {
                        trim_uid(&meta.media_storage_sop_class_uid).to_string()
                    }))
                    .media_storage_sop_instance_uid(sop_instance.unwrap_or_else(|| {
                        trim_uid(&meta.media_storage_sop_instance_uid).to_string()
                    }))
                    .transfer_syntax(trim_uid(&meta.transfer_syntax))
                    .implementation_class_uid(trim_uid(&meta.implementation_class_uid));
                if let Some(name) = &meta.implementation_version_name {
                    builder = builder.implementation_version_name(trim_uid(name));
                }
                if let Some(title) = &meta.source_application_entity_title {
                    builder = builder.source_application_entity_title(trim_uid(title));
                }
                let meta = builder
                    .build()
                    .map_err(|err| Error::write(&self.path, err))?;
                Ok(self.record.clone().with_exact_meta(meta))
            }
            None => {
                let builder = FileMetaTableBuilder::new()
                    .media_storage_sop_class_uid(sop_class.unwrap_or_default())
                    .media_storage_sop_instance_uid(sop_instance.unwrap_or_default())
                    .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN);
                self.record
                    .clone()
                    .with_meta(builder)
                    .map_err(|err| Error::write(&self.path, err))
            }
        }
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.record.element(tag).is_ok()
    }
}

fn file_stats(path: &Path) -> (u64, Option<SystemTime>) {
    match std::fs::metadata(path) {
        Ok(metadata) => (metadata.len(), metadata.modified().ok()),
        Err(_) => (0, None),
    }
}

/// A dataset without the UID never disagrees with the meta group.
fn same_uid(dataset: Option<&str>, meta: &str) -> bool {
    dataset.is_none_or(|uid| uid == trim_uid(meta))
}

fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(['\0', ' '])
}

fn attribute_text(record: &InMemDicomObject, name: &str) -> Option<String> {
    record
        .element_by_name(name)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| value.trim().trim_end_matches('\0').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::dictionary_std::tags;

    #[test]
    fn summary_reads_common_fields() {
        let mut record = InMemDicomObject::new_empty();
        record.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from("P-001"),
        ));
        record.put(DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("MR")));

        let item = FileItem::new("/data/a.dcm", record);
        assert_eq!(item.summary.patient_id, "P-001");
        assert_eq!(item.summary.modality, "MR");
        assert_eq!(item.summary.study_instance_uid, "Unknown");
        assert_eq!(item.file_name(), "a.dcm");
        assert!(!item.modified);
    }

    #[test]
    fn marking_modified_refreshes_summary() {
        let mut item = FileItem::new("b.dcm", InMemDicomObject::new_empty());
        item.record.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from("P-002"),
        ));
        item.mark_modified();
        assert!(item.modified);
        assert_eq!(item.summary.patient_id, "P-002");
    }

    #[test]
    fn reverting_every_edit_clears_modified() {
        let mut item = FileItem::new("c.dcm", InMemDicomObject::new_empty());
        item.mark_modified();
        item.mark_modified();
        item.mark_reverted();
        assert!(item.modified);
        item.mark_reverted();
        assert!(!item.modified);
    }

    #[test]
    fn undo_past_a_save_marks_modified() {
        let mut item = FileItem::new("d.dcm", InMemDicomObject::new_empty());
        item.mark_modified();
        item.mark_saved();
        assert!(!item.modified);
        item.mark_reverted();
        assert!(item.modified);
    }
}
