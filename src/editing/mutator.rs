//! In-place mutation of a dataset from user text.
//!
//! Every function either applies its change completely or leaves the
//! record untouched: the replacement value is fully converted before the
//! record is modified.

use dicom::core::header::Header;
use dicom::core::{PrimitiveValue, Tag, VR};
use dicom::object::mem::InMemElement;
use dicom::object::InMemDicomObject;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::registry::parse_tag;
use crate::utils::format_tag;
use crate::vr::{self, rule_for, NativeKind, VALUE_SEPARATOR};

/// Replaces the value of an existing field, keeping its VR.
pub fn update_value(record: &mut InMemDicomObject, tag: Tag, text: &str) -> Result<()> {
    let vr = record.element(tag).map_err(|_| Error::NotFound(tag))?.vr();
    let element = build_element(tag, vr, text)?;
    record.put(element);
    log::debug!("Updated {} to {text:?}", format_tag(tag));
    Ok(())
}

/// Updates the field if it exists, otherwise inserts it with `vr`.
pub fn add_or_restore(record: &mut InMemDicomObject, tag: Tag, vr: VR, text: &str) -> Result<()> {
    if record.element(tag).is_ok() {
        return update_value(record, tag, text);
    }
    let element = build_element(tag, vr, text)?;
    record.put(element);
    log::debug!("Added {} as {}", format_tag(tag), vr.to_string());
    Ok(())
}

/// Removes a field and hands back what was removed.
pub fn remove_tag(record: &mut InMemDicomObject, tag: Tag) -> Result<InMemElement> {
    let element = record.element(tag).map_err(|_| Error::NotFound(tag))?.clone();
    record.remove_element(tag);
    log::debug!("Removed {}", format_tag(tag));
    Ok(element)
}

/// Puts a previously captured field back exactly as it was.
pub fn restore_element(record: &mut InMemDicomObject, element: InMemElement) {
    record.put(element);
}

fn build_element(tag: Tag, vr: VR, text: &str) -> Result<InMemElement> {
    if !vr::is_text_editable(vr) {
        return Err(Error::Conversion {
            tag,
            message: format!("values with VR {} cannot be edited as text", vr.to_string()),
        });
    }

    let validation = vr::validate(tag, vr, text);
    if !validation.valid {
        return Err(Error::Validation {
            tag,
            message: validation.message,
        });
    }

    let value = to_native(tag, vr, text)?;
    Ok(InMemElement::new(tag, vr, value))
}

/// Converts text into the native value layout of `vr`.
///
/// A component that does not convert fails the whole value; nothing falls
/// back to raw string storage.
pub fn to_native(tag: Tag, vr: VR, text: &str) -> Result<PrimitiveValue> {
    if text.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }
    let native = rule_for(vr).map_or(NativeKind::Strings, |rule| rule.native);

    let value = match native {
        NativeKind::Strings => PrimitiveValue::Strs(
            text.split(VALUE_SEPARATOR)
                .map(str::to_string)
                .collect(),
        ),
        NativeKind::Text => PrimitiveValue::Str(text.to_string()),
        NativeKind::U16 => PrimitiveValue::U16(parse_components::<u16, _>(tag, text)?),
        NativeKind::I16 => PrimitiveValue::I16(parse_components::<i16, _>(tag, text)?),
        NativeKind::U32 => PrimitiveValue::U32(parse_components::<u32, _>(tag, text)?),
        NativeKind::I32 => PrimitiveValue::I32(parse_components::<i32, _>(tag, text)?),
        NativeKind::U64 => PrimitiveValue::U64(parse_components::<u64, _>(tag, text)?),
        NativeKind::I64 => PrimitiveValue::I64(parse_components::<i64, _>(tag, text)?),
        NativeKind::F32 => PrimitiveValue::F32(parse_components::<f32, _>(tag, text)?),
        NativeKind::F64 => PrimitiveValue::F64(parse_components::<f64, _>(tag, text)?),
        NativeKind::Tags => {
            let tags = text
                .split(VALUE_SEPARATOR)
                .map(|component| {
                    parse_tag(component).ok_or_else(|| Error::Conversion {
                        tag,
                        message: format!("{component:?} is not a tag"),
                    })
                })
                .collect::<Result<Vec<Tag>>>()?;
            PrimitiveValue::Tags(tags.into_iter().collect())
        }
        NativeKind::Binary | NativeKind::Sequence => {
            return Err(Error::Conversion {
                tag,
                message: format!("values with VR {} cannot be edited as text", vr.to_string()),
            })
        }
    };
    Ok(value)
}

fn parse_components<T, B>(tag: Tag, text: &str) -> Result<B>
where
    T: FromStr,
    T::Err: Display,
    B: FromIterator<T>,
{
    text.split(VALUE_SEPARATOR)
        .map(|component| {
            component.trim().parse::<T>().map_err(|err| Error::Conversion {
                tag,
                message: format!("{component:?}: {err}"),
            })
        })
        .collect()
}
