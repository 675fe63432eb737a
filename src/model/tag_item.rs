use dicom::core::{Tag, VR};

use crate::utils::format_tag;
use crate::vr::{self, Severity, ValidationResult};

/// One row of a tag list: a field of a dataset plus its presentation state.
#[derive(Debug, Clone, PartialEq)]
pub struct TagItem {
    pub tag: Tag,
    pub vr: VR,
    pub name: String,
    pub value: String,
    pub depth: usize,
    pub is_private: bool,
    pub is_sequence: bool,
    pub editable: bool,
    pub selected: bool,
    pub expanded: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
}

impl TagItem {
    pub fn tag_text(&self) -> String {
        format_tag(self.tag)
    }

    pub fn vr_text(&self) -> &'static str {
        self.vr.to_string()
    }

    /// Validates a pending edit and records the outcome on the row.
    pub fn check_edit(&mut self, text: &str) -> ValidationResult {
        let result = vr::validate(self.tag, self.vr, text);
        self.has_error = result.severity == Severity::Error;
        self.error_message = (!result.message.is_empty()).then(|| result.message.clone());
        result
    }

    pub fn clear_error(&mut self) {
        self.has_error = false;
        self.error_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(vr: VR) -> TagItem {
        TagItem {
            tag: Tag(0x0008, 0x0020),
            vr,
            name: "StudyDate".to_string(),
            value: "20240101".to_string(),
            depth: 0,
            is_private: false,
            is_sequence: false,
            editable: true,
            selected: false,
            expanded: false,
            has_error: false,
            error_message: None,
        }
    }

    #[test]
    fn failed_check_flags_the_row() {
        let mut row = item(VR::DA);
        let result = row.check_edit("2024-01-01");
        assert!(!result.valid);
        assert!(row.has_error);
        assert!(row.error_message.is_some());

        row.check_edit("20240102");
        assert!(!row.has_error);
        assert_eq!(row.error_message, None);
    }

    #[test]
    fn formats_tag_and_vr() {
        let row = item(VR::DA);
        assert_eq!(row.tag_text(), "0008,0020");
        assert_eq!(row.vr_text(), "DA");
    }
}
