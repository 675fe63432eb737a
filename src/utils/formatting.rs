use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::{Tag, VR};

const MAX_VALUE_LEN: usize = 120;
const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Editable text of a field: every value joined by the `\` separator.
///
/// Sequences and encapsulated pixel data have no textual form and yield an
/// empty string.
pub fn value_text<I, P>(value: &Value<I, P>) -> String {
    match value {
        Value::Primitive(primitive) => primitive_text(primitive),
        Value::Sequence(_) | Value::PixelSequence(_) => String::new(),
    }
}

/// Display text of a field as shown in a tag list: placeholders for
/// sequences and binary payloads, long text truncated.
pub fn value_to_string<I, P>(value: &Value<I, P>, vr: VR) -> String
where
    P: AsRef<[u8]>,
{
    let rendered = match value {
        Value::Primitive(primitive) => format_primitive_value(primitive, vr),
        Value::Sequence(sequence) => format_item_count(sequence.items().len()),
        Value::PixelSequence(sequence) => {
            let bytes: usize = sequence
                .fragments()
                .iter()
                .map(|fragment| fragment.as_ref().len())
                .sum();
            format_binary_size(bytes)
        }
    };

    if rendered.chars().count() > MAX_VALUE_LEN {
        let mut truncated = rendered.chars().take(MAX_VALUE_LEN).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        rendered
    }
}

pub fn format_tag(tag: Tag) -> String {
    format!("{:04X},{:04X}", tag.group(), tag.element())
}

pub fn format_item_count(count: usize) -> String {
    format!("[{count} item(s)]")
}

pub fn format_binary_size(bytes: usize) -> String {
    if bytes == 0 {
        return String::from("[Empty binary data]");
    }
    let size = bytes as f64;
    if size < KB {
        format!("[Binary: {bytes} bytes]")
    } else if size < MB {
        format!("[Binary: {:.1} KB]", size / KB)
    } else {
        format!("[Binary: {:.1} MB]", size / MB)
    }
}

fn primitive_text(value: &PrimitiveValue) -> String {
    match value {
        PrimitiveValue::Empty => String::new(),
        PrimitiveValue::Tags(values) => values
            .iter()
            .map(|tag| format_tag(*tag))
            .collect::<Vec<_>>()
            .join("\\"),
        _ => value.to_str().into_owned(),
    }
}

fn format_primitive_value(value: &PrimitiveValue, vr: VR) -> String {
    if is_binary_vr(vr) {
        return format_binary_size(value.calculate_byte_len());
    }
    primitive_text(value)
}

pub fn is_binary_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_upper_hex_pair() {
        assert_eq!(format_tag(Tag(0x0008, 0x103e)), "0008,103E");
    }

    #[test]
    fn binary_sizes_scale() {
        assert_eq!(format_binary_size(0), "[Empty binary data]");
        assert_eq!(format_binary_size(512), "[Binary: 512 bytes]");
        assert_eq!(format_binary_size(2048), "[Binary: 2.0 KB]");
        assert_eq!(format_binary_size(3 * 1024 * 1024), "[Binary: 3.0 MB]");
    }

    #[test]
    fn multi_values_join_with_backslash() {
        let value = PrimitiveValue::Strs(["A", "B"].iter().map(|s| s.to_string()).collect());
        assert_eq!(primitive_text(&value), "A\\B");
    }
}
