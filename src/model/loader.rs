use crossbeam::channel;
use dicom::object::open_file;
use std::path::{Path, PathBuf};
use std::thread;

use super::FileItem;
use crate::error::{Error, Result};
use crate::task::{CancellationToken, Progress};

/// Files that loaded, plus one message per file that did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub items: Vec<FileItem>,
    pub errors: Vec<String>,
}

pub fn load_dicom(path: &Path) -> Result<FileItem> {
    log::info!("Loading DICOM file: {}", path.display());
    let object = open_file(path).map_err(|err| {
        let error = Error::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        log::error!("{error}");
        error
    })?;

    Ok(FileItem::from_file_object(path, object))
}

/// Parses `paths` on up to `max_workers` threads.
///
/// Items come back in the order of `paths` regardless of which worker
/// finished first. Progress is reported from the calling thread once per
/// file. Cancellation discards everything loaded so far.
pub fn load_all(
    paths: &[PathBuf],
    max_workers: usize,
    progress: &mut dyn FnMut(Progress),
    cancel: &CancellationToken,
) -> Result<LoadReport> {
    let total = paths.len();
    let workers = max_workers.clamp(1, total.max(1));
    let (job_tx, job_rx) = channel::unbounded::<(usize, &Path)>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, Result<FileItem>)>();

    for job in paths.iter().map(PathBuf::as_path).enumerate() {
        // the receiver outlives this loop, so sending cannot fail
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let mut slots: Vec<Option<Result<FileItem>>> = (0..total).map(|_| None).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, path) in job_rx.iter() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if result_tx.send((index, load_dicom(path))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        for (processed, (index, result)) in result_rx.iter().enumerate() {
            let message = match &result {
                Ok(item) => format!("Loaded {}", item.file_name()),
                Err(err) => format!("Failed: {err}"),
            };
            slots[index] = Some(result);
            progress(Progress::new(processed + 1, total, message));
        }
    });

    cancel.check()?;

    let mut report = LoadReport::default();
    for result in slots.into_iter().flatten() {
        match result {
            Ok(item) => report.items.push(item),
            Err(err) => report.errors.push(err.to_string()),
        }
    }
    log::info!(
        "Loaded {} of {total} file(s), {} failed",
        report.items.len(),
        report.errors.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_sample_file;

    #[test]
    fn loads_files_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| write_sample_file(dir.path(), &format!("img{i}.dcm"), &format!("P{i}")))
            .collect();

        let mut updates = Vec::new();
        let report = load_all(&paths, 3, &mut |p| updates.push(p), &CancellationToken::new())
            .unwrap();

        assert!(report.errors.is_empty());
        let ids: Vec<&str> = report
            .items
            .iter()
            .map(|item| item.summary.patient_id.as_str())
            .collect();
        assert_eq!(ids, ["P0", "P1", "P2", "P3", "P4"]);
        assert_eq!(updates.len(), 5);
        assert_eq!(updates.last().unwrap().percentage, 100.0);
    }

    #[test]
    fn unreadable_files_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_sample_file(dir.path(), "good.dcm", "P1");
        let bad = dir.path().join("bad.dcm");
        std::fs::write(&bad, b"not a dicom file").unwrap();

        let report = load_all(&[good, bad], 2, &mut |_| {}, &CancellationToken::new()).unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("bad.dcm"));
    }

    #[test]
    fn cancelled_load_discards_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_file(dir.path(), "a.dcm", "P1");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = load_all(&[path], 2, &mut |_| {}, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
