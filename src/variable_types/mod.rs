//! # Module Variable Types - Types de données UPnP
//!
//! Ce module implémente le système de types UPnP : chaque variable d'état
//! porte un tag de type UPnP et une valeur polymorphe correspondante.
//!
//! ## Fonctionnalités
//!
//! - ✅ Enum fermé [`StateValue`] discriminé par tag (pas de réflexion)
//! - ✅ Marshal/unmarshal textuel conforme à la table de types UPnP
//! - ✅ Introspection de genre (`is_numeric`, `is_string`, ...)
//! - ✅ Parsing ISO8601 (formes avec tirets et compactes)
//!
//! ## Architecture
//!
//! - [`StateVarType`] : Tag de type UPnP (ui1, string, dateTime.tz, ...)
//! - [`StateValue`] : Valeur typée correspondante
//! - [`TimeOfDay`] : Décalage depuis minuit pour `time`/`time.tz`

mod cast;
mod display_type;
mod display_value;
mod errors;
mod fromstr;
mod parse;
mod time_of_day;
mod type_methods;
mod type_trait;
mod value_methods;

use std::fmt::Debug;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use url::Url;
use uuid::Uuid;

pub use errors::StateValueError;
pub use time_of_day::TimeOfDay;
pub use type_trait::UpnpVarType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVarType {
    UI1,        // Unsigned 8-bit integer
    UI2,        // Unsigned 16-bit integer
    UI4,        // Unsigned 32-bit integer
    UI8,        // Unsigned 64-bit integer
    I1,         // Signed 8-bit integer
    I2,         // Signed 16-bit integer
    I4,         // Signed 32-bit integer
    Int,        // Signed 64-bit integer
    R4,         // 32-bit floating point
    R8,         // 64-bit floating point
    Number,     // Synonymous with r8
    Fixed14_4,  // Fixed-point decimal, |v| < 1e14, 4 fractional digits
    Float,      // Synonymous with fixed.14.4
    Char,       // Single Unicode character
    String,     // Character string
    Boolean,    // Boolean value
    BinBase64,  // Base64-encoded binary
    BinHex,     // Hex-encoded binary
    Date,       // Date (YYYY-MM-DD)
    DateTime,   // DateTime without timezone
    DateTimeTZ, // DateTime with timezone
    Time,       // Time without timezone
    TimeTZ,     // Time with timezone
    UUID,       // Universally unique identifier
    URI,        // Uniform Resource Identifier
}

#[derive(Clone, Debug)]
pub enum StateValue {
    UI1(u8),
    UI2(u16),
    UI4(u32),
    UI8(u64),
    I1(i8),
    I2(i16),
    I4(i32),
    Int(i64),
    R4(f32),
    R8(f64),
    Number(f64),
    Fixed14_4(f64),
    Float(f64),
    Char(char),
    String(String),
    Boolean(bool),
    BinBase64(Vec<u8>),
    BinHex(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeTZ(DateTime<FixedOffset>),
    Time(TimeOfDay),
    TimeTZ(TimeOfDay),
    UUID(Uuid),
    URI(Url),
}
