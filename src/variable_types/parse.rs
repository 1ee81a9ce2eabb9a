//! Parsing des valeurs UPnP depuis leur forme textuelle.
//!
//! Point d'entrée : [`StateValue::parse`], le registre de construction
//! tag → valeur utilisé partout où une description déclare une variable.
//!
//! Tolérance : pour tous les tags numériques, la chaîne vide se parse comme
//! la valeur zéro du tag (les descriptions omettent souvent les défauts).

use base64::Engine;
use base64::engine::general_purpose;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::variable_types::time_of_day::{parse_time_parts, parse_timezone};
use crate::variable_types::{StateValue, StateValueError, StateVarType, TimeOfDay};

// yyyy[-mm[-dd]] et yyyy[mm[dd]]
static RE_DATE_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?$").unwrap());
static RE_DATE_COMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:(\d{2})(?:(\d{2}))?)?$").unwrap());

// découpe date / heure / fuseau d'une chaîne ISO8601 complète
static RE_DATE_TIME_ZONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^T]+)(?:T([^-+Z]+)(.+)?)?$").unwrap());

macro_rules! parse_numeric {
    ($s:expr, $variant:ident, $ty:ty, $tag:expr) => {{
        if $s.is_empty() {
            Ok(StateValue::$variant(0 as $ty))
        } else {
            $s.parse::<$ty>()
                .map(StateValue::$variant)
                .map_err(|e| StateValueError::ParseError(format!(
                    "cannot parse {} from '{}': {}",
                    $tag, $s, e
                )))
        }
    }};
}

impl StateValue {
    /// Valeur zéro d'un tag : valeur initiale d'une variable déclarée sans
    /// défaut. `char` et `uri` n'ont pas de zéro représentable.
    pub fn zero(var_type: StateVarType) -> Result<StateValue, StateValueError> {
        match var_type {
            StateVarType::Boolean => Ok(StateValue::Boolean(false)),
            StateVarType::Date => Ok(StateValue::Date(NaiveDate::default())),
            StateVarType::DateTime => Ok(StateValue::DateTime(NaiveDateTime::default())),
            StateVarType::DateTimeTZ => {
                let offset = FixedOffset::east_opt(0).unwrap();
                Ok(StateValue::DateTimeTZ(
                    offset.from_utc_datetime(&NaiveDateTime::default()),
                ))
            }
            StateVarType::Time => TimeOfDay::new(0).map(StateValue::Time),
            StateVarType::TimeTZ => TimeOfDay::with_offset(0, 0).map(StateValue::TimeTZ),
            StateVarType::UUID => Ok(StateValue::UUID(Uuid::nil())),
            StateVarType::Char | StateVarType::URI => Err(StateValueError::TypeError(format!(
                "type {} has no zero value",
                var_type
            ))),
            // les tags numériques, chaîne et binaires parsent la chaîne vide
            other => StateValue::parse(other, ""),
        }
    }

    /// Construit une valeur typée depuis sa forme textuelle UPnP.
    pub fn parse(var_type: StateVarType, s: &str) -> Result<StateValue, StateValueError> {
        match var_type {
            StateVarType::UI1 => parse_numeric!(s, UI1, u8, "ui1"),
            StateVarType::UI2 => parse_numeric!(s, UI2, u16, "ui2"),
            StateVarType::UI4 => parse_numeric!(s, UI4, u32, "ui4"),
            StateVarType::UI8 => parse_numeric!(s, UI8, u64, "ui8"),
            StateVarType::I1 => parse_numeric!(s, I1, i8, "i1"),
            StateVarType::I2 => parse_numeric!(s, I2, i16, "i2"),
            StateVarType::I4 => parse_numeric!(s, I4, i32, "i4"),
            StateVarType::Int => parse_numeric!(s, Int, i64, "int"),
            StateVarType::R4 => parse_numeric!(s, R4, f32, "r4"),
            StateVarType::R8 => parse_numeric!(s, R8, f64, "r8"),
            StateVarType::Number => parse_numeric!(s, Number, f64, "number"),
            StateVarType::Fixed14_4 => parse_fixed(s).map(StateValue::Fixed14_4),
            StateVarType::Float => parse_fixed(s).map(StateValue::Float),
            StateVarType::Char => parse_char(s).map(StateValue::Char),
            StateVarType::String => Ok(StateValue::String(s.to_string())),
            StateVarType::Boolean => parse_boolean(s).map(StateValue::Boolean),
            StateVarType::BinBase64 => {
                if s.is_empty() {
                    return Ok(StateValue::BinBase64(Vec::new()));
                }
                general_purpose::STANDARD
                    .decode(s)
                    .map(StateValue::BinBase64)
                    .map_err(|e| {
                        StateValueError::ParseError(format!(
                            "cannot parse bin.base64 from '{}': {}",
                            s, e
                        ))
                    })
            }
            StateVarType::BinHex => {
                if s.is_empty() {
                    return Ok(StateValue::BinHex(Vec::new()));
                }
                hex::decode(s).map(StateValue::BinHex).map_err(|e| {
                    StateValueError::ParseError(format!("cannot parse bin.hex from '{}': {}", s, e))
                })
            }
            StateVarType::Date => parse_date(s).map(StateValue::Date),
            StateVarType::DateTime => parse_date_time(s).map(StateValue::DateTime),
            StateVarType::DateTimeTZ => parse_date_time_tz(s).map(StateValue::DateTimeTZ),
            StateVarType::Time => TimeOfDay::parse(s, false).map(StateValue::Time),
            StateVarType::TimeTZ => TimeOfDay::parse(s, true).map(StateValue::TimeTZ),
            StateVarType::UUID => Uuid::parse_str(s).map(StateValue::UUID).map_err(|e| {
                StateValueError::ParseError(format!("cannot parse uuid from '{}': {}", s, e))
            }),
            StateVarType::URI => Url::parse(s).map(StateValue::URI).map_err(|e| {
                StateValueError::ParseError(format!("cannot parse uri from '{}': {}", s, e))
            }),
        }
    }
}

fn parse_fixed(s: &str) -> Result<f64, StateValueError> {
    if s.is_empty() {
        return Ok(0.0);
    }
    let v: f64 = s.parse().map_err(|e| {
        StateValueError::ParseError(format!("cannot parse fixed.14.4 from '{}': {}", s, e))
    })?;
    if v >= 1e14 || v <= -1e14 {
        return Err(StateValueError::RangeError(format!(
            "fixed.14.4 value '{}' out of bounds",
            s
        )));
    }
    Ok(v)
}

fn parse_char(s: &str) -> Result<char, StateValueError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != '\0' => Ok(c),
        _ => Err(StateValueError::ParseError(format!(
            "'{}' is not a single non-zero character",
            s
        ))),
    }
}

fn parse_boolean(s: &str) -> Result<bool, StateValueError> {
    match s {
        "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        _ => Err(StateValueError::ParseError(format!(
            "cannot parse boolean from '{}'",
            s
        ))),
    }
}

/// Parse `yyyy[-mm[-dd]]` ou `yyyy[mm[dd]]`. Mois et jour manquants valent 1.
fn parse_date_parts(s: &str) -> Result<(i32, u32, u32), StateValueError> {
    let caps = RE_DATE_HYPHEN
        .captures(s)
        .or_else(|| RE_DATE_COMPACT.captures(s))
        .ok_or_else(|| {
            StateValueError::ParseError(format!(
                "'{}' is not in a recognized ISO8601 date format",
                s
            ))
        })?;

    let year: i32 = caps[1]
        .parse()
        .map_err(|e| StateValueError::ParseError(format!("'{}': {}", s, e)))?;
    let month: u32 = caps
        .get(2)
        .map(|m| m.as_str().parse())
        .transpose()
        .map_err(|e| StateValueError::ParseError(format!("'{}': {}", s, e)))?
        .unwrap_or(1);
    let day: u32 = caps
        .get(3)
        .map(|m| m.as_str().parse())
        .transpose()
        .map_err(|e| StateValueError::ParseError(format!("'{}': {}", s, e)))?
        .unwrap_or(1);

    Ok((year, month, day))
}

fn ymd(s: &str, year: i32, month: u32, day: u32) -> Result<NaiveDate, StateValueError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        StateValueError::ParseError(format!("'{}' is not a valid calendar date", s))
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, StateValueError> {
    let (year, month, day) = parse_date_parts(s)?;
    ymd(s, year, month, day)
}

/// Découpe une chaîne ISO8601 complète en (date, heure, fuseau).
fn split_date_time_zone(s: &str) -> Result<(&str, &str, &str), StateValueError> {
    let caps = RE_DATE_TIME_ZONE.captures(s).ok_or_else(|| {
        StateValueError::ParseError(format!("'{}' is not in ISO8601 datetime format", s))
    })?;
    let date = caps.get(1).map_or("", |m| m.as_str());
    let time = caps.get(2).map_or("", |m| m.as_str());
    let zone = caps.get(3).map_or("", |m| m.as_str());
    Ok((date, time, zone))
}

fn hms(s: &str, time_str: &str) -> Result<NaiveTime, StateValueError> {
    if time_str.is_empty() {
        return Ok(NaiveTime::default());
    }
    let (hour, minute, second) = parse_time_parts(time_str)?;
    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
        StateValueError::ParseError(format!("'{}' has time fields out of range", s))
    })
}

fn parse_date_time(s: &str) -> Result<NaiveDateTime, StateValueError> {
    let (date_str, time_str, zone_str) = split_date_time_zone(s)?;
    if !zone_str.is_empty() {
        return Err(StateValueError::ParseError(format!(
            "dateTime value '{}' contains unexpected timezone",
            s
        )));
    }
    let (year, month, day) = parse_date_parts(date_str)?;
    Ok(ymd(s, year, month, day)?.and_time(hms(s, time_str)?))
}

fn parse_date_time_tz(s: &str) -> Result<DateTime<FixedOffset>, StateValueError> {
    let (date_str, time_str, zone_str) = split_date_time_zone(s)?;
    let (year, month, day) = parse_date_parts(date_str)?;
    let naive = ymd(s, year, month, day)?.and_time(hms(s, time_str)?);

    let offset_secs = if zone_str.is_empty() {
        0
    } else {
        parse_timezone(zone_str)?
    };
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| {
        StateValueError::ParseError(format!("'{}' has timezone out of range", s))
    })?;
    offset.from_local_datetime(&naive).single().ok_or_else(|| {
        StateValueError::ParseError(format!("'{}' is not a valid dateTime.tz", s))
    })
}
