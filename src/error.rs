use dicom::core::Tag;
use std::path::PathBuf;

use crate::utils::format_tag;

/// Errors produced by the tag edit engine and its file collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Tag {} not found", tag_label(.0))]
    NotFound(Tag),

    #[error("{message}")]
    Validation { tag: Tag, message: String },

    #[error("Cannot convert value for tag {}: {message}", tag_label(.tag))]
    Conversion { tag: Tag, message: String },

    #[error("{}: failed to open DICOM file ({message})", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: failed to write DICOM file ({source})", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid settings: {0}")]
    Settings(String),
}

fn tag_label(tag: &Tag) -> String {
    format_tag(*tag)
}

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn write(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Write {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Formats an error list for display: the first `cap` messages, then a
/// `+K more` line when the list was truncated. The list itself is never
/// modified so callers keep the full report.
pub fn summarize_errors(errors: &[String], cap: usize) -> String {
    let mut lines: Vec<String> = errors.iter().take(cap).cloned().collect();
    let remaining = errors.len().saturating_sub(cap);
    if remaining > 0 {
        lines.push(format!("+{remaining} more"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_tag() {
        let err = Error::NotFound(Tag(0x0010, 0x0010));
        assert_eq!(err.to_string(), "Tag 0010,0010 not found");
    }

    #[test]
    fn summary_caps_messages() {
        let errors: Vec<String> = (1..=7).map(|i| format!("file{i}.dcm: bad")).collect();
        let summary = summarize_errors(&errors, 5);
        assert_eq!(summary.lines().count(), 6);
        assert!(summary.ends_with("+2 more"));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn summary_without_overflow_has_no_suffix() {
        let errors = vec!["a.dcm: bad".to_string()];
        assert_eq!(summarize_errors(&errors, 5), "a.dcm: bad");
    }
}
