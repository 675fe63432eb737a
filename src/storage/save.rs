use crate::error::{Error, Result};
use crate::model::{FileItem, WorkingSet};
use crate::settings::Settings;
use crate::task::{CancellationToken, Progress};

use super::backup::create_backup;

/// Outcome of writing the modified items of a working set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub saved: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

/// Writes one item back to its path and clears its modified flag.
///
/// A backup is taken first when enabled; failing to back up is logged and
/// does not stop the save.
pub fn save_item(item: &mut FileItem, settings: &Settings) -> Result<()> {
    if settings.create_backup_before_save && item.path.exists() {
        if let Err(err) = create_backup(&item.path, settings.max_backup_versions) {
            log::warn!("Skipping backup of {}: {err}", item.path.display());
        }
    }

    let object = item.to_file_object()?;
    object
        .write_to_file(&item.path)
        .map_err(|err| Error::write(&item.path, err))?;
    item.mark_saved();
    log::info!("Saved {}", item.path.display());
    Ok(())
}

/// Saves every modified item, continuing past failures. Unmodified items
/// are not touched and do not count towards progress.
pub fn save_modified(
    items: &mut WorkingSet,
    settings: &Settings,
    progress: &mut dyn FnMut(Progress),
    cancel: &CancellationToken,
) -> SaveReport {
    let total = items.modified_count();
    let mut report = SaveReport::default();
    let mut processed = 0;

    for item in items.iter_mut().filter(|item| item.modified) {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match save_item(item, settings) {
            Ok(()) => report.saved += 1,
            Err(err) => {
                log::warn!("{err}");
                report.errors.push(format!("{}: {err}", item.file_name()));
            }
        }
        processed += 1;
        progress(Progress::new(
            processed,
            total,
            format!("Saved {} ({processed}/{total})", item.file_name()),
        ));
    }

    log::info!(
        "Saved {} of {total} modified file(s), {} failed",
        report.saved,
        report.errors.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::mutator;
    use crate::model::loader::load_dicom;
    use crate::storage::BACKUP_DIR;
    use crate::testing::write_sample_file;
    use dicom::dictionary_std::tags;

    fn loaded_set(dir: &std::path::Path, count: usize) -> WorkingSet {
        (0..count)
            .map(|i| {
                let path = write_sample_file(dir, &format!("img{i}.dcm"), &format!("P{i}"));
                load_dicom(&path).unwrap()
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn saves_only_modified_items_and_clears_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = loaded_set(dir.path(), 3);
        {
            let item = items.get_mut(1).unwrap();
            mutator::update_value(&mut item.record, tags::PATIENT_ID, "EDITED").unwrap();
            item.mark_modified();
        }

        let mut updates = Vec::new();
        let report = save_modified(
            &mut items,
            &Settings::default(),
            &mut |p| updates.push(p),
            &CancellationToken::new(),
        );
        assert_eq!(report.saved, 1);
        assert!(report.errors.is_empty());
        assert_eq!(updates.len(), 1);
        assert_eq!(items.modified_count(), 0);

        let reloaded = load_dicom(&dir.path().join("img1.dcm")).unwrap();
        assert_eq!(reloaded.summary.patient_id, "EDITED");
        assert_eq!(std::fs::read_dir(dir.path().join(BACKUP_DIR)).unwrap().count(), 1);
    }

    #[test]
    fn backups_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = loaded_set(dir.path(), 1);
        let settings = Settings {
            create_backup_before_save: false,
            ..Settings::default()
        };
        save_item(items.get_mut(0).unwrap(), &settings).unwrap();
        assert!(!dir.path().join(BACKUP_DIR).exists());
    }

    #[test]
    fn write_failures_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = loaded_set(dir.path(), 2);
        for item in items.iter_mut() {
            item.mark_modified();
        }
        items.get_mut(0).unwrap().path = dir.path().join("missing").join("img0.dcm");

        let report = save_modified(
            &mut items,
            &Settings::default(),
            &mut |_| {},
            &CancellationToken::new(),
        );
        assert_eq!(report.saved, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("img0.dcm: "));
        assert!(items.get(0).unwrap().modified);
    }

    #[test]
    fn write_failure_keeps_its_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = loaded_set(dir.path(), 1);
        let item = items.get_mut(0).unwrap();
        item.path = dir.path().join("missing").join("img0.dcm");

        let err = save_item(item, &Settings::default()).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn edited_sop_uids_reach_the_file_meta_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut items = loaded_set(dir.path(), 1);
        let item = items.get_mut(0).unwrap();
        mutator::update_value(&mut item.record, tags::SOP_INSTANCE_UID, "1.2.3.4.5").unwrap();
        item.mark_modified();
        save_item(item, &Settings::default()).unwrap();

        let reopened = dicom::object::open_file(dir.path().join("img0.dcm")).unwrap();
        assert_eq!(
            reopened
                .meta()
                .media_storage_sop_instance_uid
                .trim_end_matches('\0'),
            "1.2.3.4.5"
        );
        assert_eq!(
            reopened
                .meta()
                .media_storage_sop_class_uid
                .trim_end_matches('\0'),
            dicom::dictionary_std::uids::SECONDARY_CAPTURE_IMAGE_STORAGE
        );
        let reloaded = load_dicom(&dir.path().join("img0.dcm")).unwrap();
        assert_eq!(reloaded.summary.sop_instance_uid, "1.2.3.4.5");
    }
}
