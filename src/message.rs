use dicom::core::{Tag, VR};
use std::path::PathBuf;

use crate::model::FileId;

/// Commands accepted by [`crate::app::App::update`].
#[derive(Debug, Clone)]
pub enum Message {
    LoadFolder(PathBuf),
    LoadFiles(Vec<PathBuf>),
    SelectFile(FileId),
    EditTag { file: FileId, tag: Tag, value: String },
    AddTag { file: FileId, tag: Tag, vr: VR, value: String },
    DeleteTag { file: FileId, tag: Tag },
    ApplyToAll { tag: Tag, value: String },
    DeleteFromAll { tag: Tag },
    BeginBatch(String),
    EndBatch,
    Undo,
    Redo,
    SaveModified,
    Cancel,
}
