//! Tag edit engine for DICOM files: per-VR validation, reversible edits
//! with undo/redo, and bulk edits across many files.

pub mod app;
pub mod editing;
pub mod error;
pub mod message;
pub mod model;
pub mod registry;
pub mod settings;
pub mod storage;
pub mod task;
pub mod utils;
pub mod vr;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
