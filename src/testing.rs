//! Fixtures shared by unit tests across modules.

use dicom::core::header::Header;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::{tags, uids};
use dicom::object::meta::FileMetaTableBuilder;
use dicom::object::InMemDicomObject;
use std::path::{Path, PathBuf};

use crate::model::{FileItem, WorkingSet};
use crate::utils::value_text;

/// Field-for-field view of a record: tag, VR and value text, in tag order.
pub fn snapshot(record: &InMemDicomObject) -> Vec<(Tag, VR, String)> {
    record
        .iter()
        .map(|element| (element.tag(), element.vr(), value_text(element.value())))
        .collect()
}

pub fn sample_record(patient_id: &str) -> InMemDicomObject {
    let mut record = InMemDicomObject::new_empty();
    record.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
    ));
    record.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(format!("1.2.826.0.1.3680043.2.1125.{}", patient_id.len())),
    ));
    record.put(DataElement::new(
        tags::STUDY_DATE,
        VR::DA,
        PrimitiveValue::from("20240101"),
    ));
    record.put(DataElement::new(
        tags::MODALITY,
        VR::CS,
        PrimitiveValue::from("CT"),
    ));
    record.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from("Doe^John"),
    ));
    record.put(DataElement::new(
        tags::PATIENT_ID,
        VR::LO,
        PrimitiveValue::from(patient_id),
    ));
    record.put(DataElement::new(
        tags::ROWS,
        VR::US,
        PrimitiveValue::from(512_u16),
    ));
    record
}

/// A working set of in-memory items named `file0.dcm`, `file1.dcm`, ...
pub fn working_set(count: usize) -> WorkingSet {
    (0..count)
        .map(|i| FileItem::new(format!("file{i}.dcm"), sample_record(&format!("P{i}"))))
        .collect::<Vec<_>>()
        .into()
}

pub fn write_sample_file(dir: &Path, name: &str, patient_id: &str) -> PathBuf {
    let path = dir.join(name);
    let record = sample_record(patient_id);
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1125.1")
        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);
    record
        .with_meta(meta)
        .expect("valid file meta")
        .write_to_file(&path)
        .expect("write sample file");
    path
}
