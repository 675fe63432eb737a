//! Flattening of a dataset into display rows, plus tag naming and parsing.

pub mod private;

use dicom::core::dictionary::DataDictionary;
use dicom::core::header::Header;
use dicom::core::value::Value;
use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::mem::InMemElement;
use dicom::object::InMemDicomObject;

use crate::model::TagItem;
use crate::utils::value_to_string;
use crate::vr::is_text_editable;

type Entries<'a> = Box<dyn Iterator<Item = (&'a InMemDicomObject, &'a InMemElement)> + 'a>;

/// Lazy pre-order walk over a dataset and its sequence items.
///
/// Nested items are tracked on an explicit stack, so nesting depth is bounded
/// by memory rather than by the call stack.
pub struct FlatTags<'a> {
    stack: Vec<(Entries<'a>, usize)>,
    include_private: bool,
}

impl<'a> Iterator for FlatTags<'a> {
    type Item = TagItem;

    fn next(&mut self) -> Option<TagItem> {
        loop {
            let (entries, depth) = self.stack.last_mut()?;
            let depth = *depth;
            let Some((owner, element)) = entries.next() else {
                self.stack.pop();
                continue;
            };

            let tag = element.tag();
            let is_private = tag.group() % 2 == 1;
            if is_private && !self.include_private {
                continue;
            }

            let item = tag_item(owner, element, depth);
            if let Value::Sequence(sequence) = element.value() {
                let nested: Entries<'a> = Box::new(
                    sequence
                        .items()
                        .iter()
                        .flat_map(|item| item.iter().map(move |element| (item, element))),
                );
                self.stack.push((nested, depth + 1));
            }
            return Some(item);
        }
    }
}

/// Flattens `record` into display rows in tag order. Calling it again
/// restarts the walk.
///
/// With `include_private` unset, odd-group fields and everything nested
/// under them are skipped.
pub fn extract_flat(record: &InMemDicomObject, include_private: bool) -> FlatTags<'_> {
    let root: Entries<'_> = Box::new(record.iter().map(move |element| (record, element)));
    FlatTags {
        stack: vec![(root, 0)],
        include_private,
    }
}

fn tag_item(owner: &InMemDicomObject, element: &InMemElement, depth: usize) -> TagItem {
    let tag = element.tag();
    let vr = element.vr();
    let is_sequence = matches!(element.value(), Value::Sequence(_));
    TagItem {
        tag,
        vr,
        name: tag_name(owner, tag),
        value: value_to_string(element.value(), vr),
        depth,
        is_private: tag.group() % 2 == 1,
        is_sequence,
        editable: !is_sequence && is_text_editable(vr),
        selected: false,
        expanded: is_sequence,
        has_error: false,
        error_message: None,
    }
}

/// Human readable name of `tag` as found in `record`.
///
/// Private tags resolve through their creator block; tags missing from
/// both dictionaries get a generic label.
pub fn tag_name(record: &InMemDicomObject, tag: Tag) -> String {
    if tag.group() % 2 == 1 {
        return private::private_tag_name(record, tag)
            .unwrap_or("Private Tag")
            .to_string();
    }
    StandardDataDictionary
        .by_tag(tag)
        .map(|entry| entry.alias)
        .unwrap_or("Unknown")
        .to_string()
}

/// Parses `GGGG,EEEE`, `(GGGG,EEEE)`, `GGGGEEEE` or a dictionary keyword
/// such as `PatientName`.
pub fn parse_tag(text: &str) -> Option<Tag> {
    let text = text.trim();
    let inner = text
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(text);

    let (group, element) = match inner.split_once(',') {
        Some((group, element)) => (group.trim(), element.trim()),
        None if inner.len() == 8 && inner.is_ascii() => inner.split_at(4),
        None => return keyword_tag(inner),
    };

    if group.len() != 4 || element.len() != 4 {
        return None;
    }
    let group = u16::from_str_radix(group, 16).ok()?;
    let element = u16::from_str_radix(element, 16).ok()?;
    Some(Tag(group, element))
}

fn keyword_tag(keyword: &str) -> Option<Tag> {
    StandardDataDictionary
        .by_name(keyword)
        .map(|entry| entry.tag.inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::value::DataSetSequence;
    use dicom::core::{DataElement, PrimitiveValue, VR};
    use dicom::dictionary_std::tags;

    fn sequence_of(items: Vec<InMemDicomObject>) -> InMemElement {
        DataElement::new(
            tags::REFERENCED_IMAGE_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(items),
        )
    }

    fn item_with_uid(uid: &str) -> InMemDicomObject {
        let mut item = InMemDicomObject::new_empty();
        item.put(DataElement::new(
            tags::REFERENCED_SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(uid),
        ));
        item
    }

    fn sample_record() -> InMemDicomObject {
        let mut record = InMemDicomObject::new_empty();
        record.put(DataElement::new(
            tags::PATIENT_NAME,
            VR::PN,
            PrimitiveValue::from("Doe^John"),
        ));
        record.put(DataElement::new(
            tags::MODALITY,
            VR::CS,
            PrimitiveValue::from("CT"),
        ));
        record.put(sequence_of(vec![item_with_uid("1.2.3"), item_with_uid("1.2.4")]));
        record.put(DataElement::new(
            Tag(0x0029, 0x0010),
            VR::LO,
            PrimitiveValue::from("SIEMENS CSA HEADER"),
        ));
        record.put(DataElement::new(
            Tag(0x0029, 0x1010),
            VR::OB,
            PrimitiveValue::U8(vec![0u8; 2048].into_iter().collect()),
        ));
        record.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::Empty,
        ));
        record
    }

    #[test]
    fn flattens_in_tag_order_with_nested_items() {
        let record = sample_record();
        let rows: Vec<TagItem> = extract_flat(&record, true).collect();
        let tags: Vec<String> = rows.iter().map(TagItem::tag_text).collect();
        assert_eq!(
            tags,
            [
                "0008,0060",
                "0008,1140",
                "0008,1155",
                "0008,1155",
                "0010,0010",
                "0029,0010",
                "0029,1010",
                "7FE0,0010",
            ]
        );

        let sequence = &rows[1];
        assert!(sequence.is_sequence);
        assert!(!sequence.editable);
        assert_eq!(sequence.value, "[2 item(s)]");
        assert_eq!(rows[2].depth, 1);
        assert_eq!(rows[2].value, "1.2.3");
        assert_eq!(rows[3].value, "1.2.4");
        assert_eq!(rows[4].depth, 0);
        assert_eq!(rows[4].name, "PatientName");
    }

    #[test]
    fn binary_fields_render_placeholders() {
        let record = sample_record();
        let rows: Vec<TagItem> = extract_flat(&record, true).collect();
        let private = rows.iter().find(|row| row.tag == Tag(0x0029, 0x1010)).unwrap();
        assert_eq!(private.value, "[Binary: 2.0 KB]");
        assert_eq!(private.name, "CSA Image Header Info");
        assert!(!private.editable);
        let pixels = rows.iter().find(|row| row.tag == tags::PIXEL_DATA).unwrap();
        assert_eq!(pixels.value, "[Empty binary data]");
    }

    #[test]
    fn private_fields_can_be_hidden() {
        let mut record = sample_record();
        let mut private_item = InMemDicomObject::new_empty();
        private_item.put(DataElement::new(
            tags::PATIENT_ID,
            VR::LO,
            PrimitiveValue::from("hidden"),
        ));
        record.put(DataElement::new(
            Tag(0x0029, 0x1020),
            VR::SQ,
            DataSetSequence::from(vec![private_item]),
        ));

        let rows: Vec<TagItem> = extract_flat(&record, false).collect();
        assert!(rows.iter().all(|row| !row.is_private));
        assert!(rows.iter().all(|row| row.tag != tags::PATIENT_ID));
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn walk_is_restartable() {
        let record = sample_record();
        let first = extract_flat(&record, true).count();
        let second = extract_flat(&record, true).count();
        assert_eq!(first, second);
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        // building and dropping the tree recurses, walking it must not
        let worker = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let mut record = item_with_uid("1.2.3");
                for _ in 0..2_000 {
                    let mut parent = InMemDicomObject::new_empty();
                    parent.put(sequence_of(vec![record]));
                    record = parent;
                }
                extract_flat(&record, true).count()
            })
            .unwrap();
        assert_eq!(worker.join().unwrap(), 2_001);
    }

    #[test]
    fn parses_tag_notations() {
        let expected = Some(Tag(0x0010, 0x0020));
        assert_eq!(parse_tag("0010,0020"), expected);
        assert_eq!(parse_tag("(0010,0020)"), expected);
        assert_eq!(parse_tag("00100020"), expected);
        assert_eq!(parse_tag("PatientID"), expected);
        assert_eq!(parse_tag("00100020X"), None);
        assert_eq!(parse_tag("zz10,0020"), None);
        assert_eq!(parse_tag("NotAKeyword"), None);
    }
}
