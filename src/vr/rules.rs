use chrono::NaiveDate;
use dicom::core::VR;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::parse_tag;

static AGE_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3}[DWMY]$").unwrap());
static CODE_STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_ ]*$").unwrap());
static DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{8}$").unwrap());
static TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{2,6}(\.[0-9]{1,6})?$").unwrap());
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}([0-9]{2}([0-9]{2}([0-9]{2}([0-9]{2}([0-9]{2}(\.[0-9]{1,6})?)?)?)?)?)?([+-][0-9]{4})?$").unwrap()
});
static UID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9.]*$").unwrap());

/// Outcome of a semantic check on one value component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Ok,
    Warning(String),
    Error(String),
}

/// Native layout a VR's text is converted to on write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    /// Multi-valued string, stored as separate strings.
    Strings,
    /// Single free-text value; the separator is an ordinary character.
    Text,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Tags,
    Binary,
    Sequence,
}

impl NativeKind {
    /// Whether values of this kind can be replaced from free text.
    pub fn is_text_editable(self) -> bool {
        !matches!(self, NativeKind::Binary | NativeKind::Sequence)
    }
}

pub type Check = fn(&str) -> Finding;

/// Per-VR constraints: maximum component length, semantic check and
/// native conversion target.
#[derive(Clone, Copy)]
pub struct VrRule {
    pub vr: VR,
    pub max_len: Option<usize>,
    pub multi_valued: bool,
    pub check: Option<Check>,
    pub native: NativeKind,
}

const fn rule(
    vr: VR,
    max_len: Option<usize>,
    multi_valued: bool,
    check: Option<Check>,
    native: NativeKind,
) -> VrRule {
    VrRule {
        vr,
        max_len,
        multi_valued,
        check,
        native,
    }
}

static RULES: &[VrRule] = &[
    rule(VR::AE, Some(16), true, Some(check_application_entity), NativeKind::Strings),
    rule(VR::AS, Some(4), true, Some(check_age_string), NativeKind::Strings),
    rule(VR::AT, None, true, Some(check_attribute_tag), NativeKind::Tags),
    rule(VR::CS, Some(16), true, Some(check_code_string), NativeKind::Strings),
    rule(VR::DA, Some(8), true, Some(check_date), NativeKind::Strings),
    rule(VR::DS, Some(16), true, Some(check_decimal_string), NativeKind::Strings),
    rule(VR::DT, Some(26), true, Some(check_date_time), NativeKind::Strings),
    rule(VR::FL, None, true, Some(check_f32), NativeKind::F32),
    rule(VR::FD, None, true, Some(check_f64), NativeKind::F64),
    rule(VR::IS, Some(12), true, Some(check_integer_string), NativeKind::Strings),
    rule(VR::LO, Some(64), true, Some(check_no_control), NativeKind::Strings),
    rule(VR::LT, Some(10240), false, Some(check_text_block), NativeKind::Text),
    rule(VR::OB, None, false, None, NativeKind::Binary),
    rule(VR::OD, None, false, None, NativeKind::Binary),
    rule(VR::OF, None, false, None, NativeKind::Binary),
    rule(VR::OL, None, false, None, NativeKind::Binary),
    rule(VR::OV, None, false, None, NativeKind::Binary),
    rule(VR::OW, None, false, None, NativeKind::Binary),
    rule(VR::PN, Some(64), true, Some(check_person_name), NativeKind::Strings),
    rule(VR::SH, Some(16), true, Some(check_no_control), NativeKind::Strings),
    rule(VR::SL, None, true, Some(check_i32), NativeKind::I32),
    rule(VR::SQ, None, false, None, NativeKind::Sequence),
    rule(VR::SS, None, true, Some(check_i16), NativeKind::I16),
    rule(VR::ST, Some(1024), false, Some(check_text_block), NativeKind::Text),
    rule(VR::SV, None, true, Some(check_i64), NativeKind::I64),
    rule(VR::TM, Some(14), true, Some(check_time), NativeKind::Strings),
    rule(VR::UC, None, true, Some(check_no_control), NativeKind::Strings),
    rule(VR::UI, Some(64), true, Some(check_uid), NativeKind::Strings),
    rule(VR::UL, None, true, Some(check_u32), NativeKind::U32),
    rule(VR::UN, None, false, None, NativeKind::Binary),
    rule(VR::UR, None, false, Some(check_no_control), NativeKind::Text),
    rule(VR::US, None, true, Some(check_u16), NativeKind::U16),
    rule(VR::UT, None, false, Some(check_text_block), NativeKind::Text),
    rule(VR::UV, None, true, Some(check_u64), NativeKind::U64),
];

pub fn rule_for(vr: VR) -> Option<&'static VrRule> {
    RULES.iter().find(|rule| rule.vr == vr)
}

fn check_age_string(value: &str) -> Finding {
    if AGE_STRING.is_match(value) {
        Finding::Ok
    } else {
        Finding::Error(String::from(
            "Age must be three digits followed by D, W, M or Y (e.g. 045Y)",
        ))
    }
}

fn check_code_string(value: &str) -> Finding {
    if CODE_STRING.is_match(value) {
        Finding::Ok
    } else {
        Finding::Error(String::from(
            "Code string may only contain uppercase letters, digits, spaces and underscores",
        ))
    }
}

fn check_date(value: &str) -> Finding {
    if !DATE.is_match(value) {
        return Finding::Error(String::from("Date must be in YYYYMMDD format"));
    }
    let year = value[0..4].parse::<i32>();
    let month = value[4..6].parse::<u32>();
    let day = value[6..8].parse::<u32>();
    match (year, month, day) {
        (Ok(year), Ok(month), Ok(day)) if NaiveDate::from_ymd_opt(year, month, day).is_some() => {
            Finding::Ok
        }
        _ => Finding::Error(format!("{value} is not a valid calendar date")),
    }
}

fn check_date_time(value: &str) -> Finding {
    if DATE_TIME.is_match(value) {
        Finding::Ok
    } else {
        Finding::Error(String::from(
            "Date time must be in YYYYMMDDHHMMSS.FFFFFF&ZZXX format",
        ))
    }
}

fn check_time(value: &str) -> Finding {
    if !TIME.is_match(value) {
        return Finding::Error(String::from("Time must be in HHMMSS.FFFFFF format"));
    }
    let digits = value.split('.').next().unwrap_or_default();
    // hours, minutes, seconds; seconds may be 60 for a leap second
    let limits = [23u32, 59, 60];
    for (index, limit) in limits.iter().enumerate() {
        let Some(pair) = digits.get(index * 2..index * 2 + 2) else {
            break;
        };
        match pair.parse::<u32>() {
            Ok(number) if number <= *limit => {}
            _ => return Finding::Error(format!("{value} is not a valid time of day")),
        }
    }
    if digits.len() % 2 != 0 {
        return Finding::Error(String::from("Time must be in HHMMSS.FFFFFF format"));
    }
    Finding::Ok
}

fn check_decimal_string(value: &str) -> Finding {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Finding::Ok,
        _ => Finding::Error(format!("{value} is not a valid decimal number")),
    }
}

fn check_integer_string(value: &str) -> Finding {
    match value.trim().parse::<i64>() {
        Ok(_) => Finding::Ok,
        Err(_) => Finding::Error(format!("{value} is not a valid integer")),
    }
}

fn check_no_control(value: &str) -> Finding {
    if value
        .chars()
        .any(|c| c.is_control() && c != '\r' && c != '\n')
    {
        Finding::Error(String::from("Value contains control characters"))
    } else {
        Finding::Ok
    }
}

fn check_application_entity(value: &str) -> Finding {
    if value.chars().any(char::is_control) {
        Finding::Error(String::from(
            "Application entity title contains control characters",
        ))
    } else {
        Finding::Ok
    }
}

fn check_text_block(value: &str) -> Finding {
    if value
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\r' | '\n' | '\t' | '\x0c' | '\x1b'))
    {
        Finding::Error(String::from("Text contains unsupported control characters"))
    } else {
        Finding::Ok
    }
}

fn check_person_name(value: &str) -> Finding {
    if let error @ Finding::Error(_) = check_no_control(value) {
        return error;
    }
    let components = value.split('^').count();
    if components > 5 {
        Finding::Warning(format!(
            "Person name has {components} components, at most 5 are expected (family^given^middle^prefix^suffix)"
        ))
    } else {
        Finding::Ok
    }
}

fn check_uid(value: &str) -> Finding {
    let value = value.trim_end_matches('\0');
    if UID.is_match(value) {
        Finding::Ok
    } else {
        Finding::Error(String::from("UID may only contain digits and dots"))
    }
}

fn check_attribute_tag(value: &str) -> Finding {
    match parse_tag(value) {
        Some(_) => Finding::Ok,
        None => Finding::Error(format!("{value} is not a valid tag (expected GGGG,EEEE)")),
    }
}

fn check_f32(value: &str) -> Finding {
    match value.trim().parse::<f32>() {
        Ok(number) if number.is_finite() => Finding::Ok,
        _ => Finding::Error(format!("{value} is not a valid 32-bit floating point number")),
    }
}

fn check_f64(value: &str) -> Finding {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Finding::Ok,
        _ => Finding::Error(format!("{value} is not a valid 64-bit floating point number")),
    }
}

macro_rules! integer_check {
    ($name:ident, $ty:ty) => {
        fn $name(value: &str) -> Finding {
            match value.trim().parse::<$ty>() {
                Ok(_) => Finding::Ok,
                Err(_) => Finding::Error(format!(
                    "{value} is not an integer between {} and {}",
                    <$ty>::MIN,
                    <$ty>::MAX
                )),
            }
        }
    };
}

integer_check!(check_u16, u16);
integer_check!(check_i16, i16);
integer_check!(check_u32, u32);
integer_check!(check_i32, i32);
integer_check!(check_u64, u64);
integer_check!(check_i64, i64);
