//! Names for private (odd group) tags, scoped by the private creator that
//! reserved the element block.

use dicom::core::Tag;
use dicom::object::InMemDicomObject;

/// (creator, group, element offset within the reserved block, name)
static PRIVATE_TAGS: &[(&str, u16, u8, &str)] = &[
    ("SIEMENS CSA HEADER", 0x0029, 0x08, "CSA Image Header Type"),
    ("SIEMENS CSA HEADER", 0x0029, 0x09, "CSA Image Header Version"),
    ("SIEMENS CSA HEADER", 0x0029, 0x10, "CSA Image Header Info"),
    ("SIEMENS CSA HEADER", 0x0029, 0x18, "CSA Series Header Type"),
    ("SIEMENS CSA HEADER", 0x0029, 0x19, "CSA Series Header Version"),
    ("SIEMENS CSA HEADER", 0x0029, 0x20, "CSA Series Header Info"),
    ("SIEMENS MR HEADER", 0x0019, 0x08, "CSA Image Header Type"),
    ("SIEMENS MR HEADER", 0x0019, 0x0B, "Slice Measurement Duration"),
    ("SIEMENS MR HEADER", 0x0019, 0x0C, "B Value"),
    ("SIEMENS MR HEADER", 0x0019, 0x0D, "Diffusion Directionality"),
    ("SIEMENS MR HEADER", 0x0019, 0x0E, "Diffusion Gradient Direction"),
    ("GEMS_IDEN_01", 0x0009, 0x01, "Full Fidelity"),
    ("GEMS_IDEN_01", 0x0009, 0x02, "Suite ID"),
    ("GEMS_IDEN_01", 0x0009, 0x04, "Product ID"),
    ("Philips Imaging DD 001", 0x2001, 0x03, "Diffusion B-Factor"),
    ("Philips Imaging DD 001", 0x2001, 0x04, "Diffusion Direction"),
    ("Philips Imaging DD 001", 0x2001, 0x08, "Phase Number"),
];

/// Whether `tag` is the private creator slot `(gggg,0010)`-`(gggg,00FF)`.
pub fn is_private_creator(tag: Tag) -> bool {
    tag.group() % 2 == 1 && (0x0010..=0x00FF).contains(&tag.element())
}

/// Reads the creator string that reserved the block holding `tag`.
pub fn private_creator(record: &InMemDicomObject, tag: Tag) -> Option<String> {
    let block = tag.element() >> 8;
    if block < 0x10 {
        return None;
    }
    record
        .element(Tag(tag.group(), block))
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|creator| creator.trim().to_string())
}

pub fn lookup(creator: &str, tag: Tag) -> Option<&'static str> {
    let offset = (tag.element() & 0x00FF) as u8;
    PRIVATE_TAGS
        .iter()
        .find(|(known, group, element, _)| {
            *group == tag.group() && *element == offset && known.eq_ignore_ascii_case(creator)
        })
        .map(|(_, _, _, name)| *name)
}

/// Name of a private tag within `record`, if the creator and element are
/// known.
pub fn private_tag_name(record: &InMemDicomObject, tag: Tag) -> Option<&'static str> {
    if tag.element() == 0x0000 {
        return Some("Private Group Length");
    }
    if is_private_creator(tag) {
        return Some("Private Creator");
    }
    let creator = private_creator(record, tag)?;
    lookup(&creator, tag)
}
