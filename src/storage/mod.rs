//! File-system collaborators of the edit engine: finding files, keeping
//! backups and writing modified items back.

pub mod backup;
pub mod discovery;
pub mod save;

pub use backup::{create_backup, BACKUP_DIR};
pub use discovery::{discover, is_dicom_candidate};
pub use save::{save_item, save_modified, SaveReport};
