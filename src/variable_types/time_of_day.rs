//! Heure du jour pour les types UPnP `time` et `time.tz`.
//!
//! ISO8601 autorise la borne haute 24:00:00 incluse, ce qu'un type horloge
//! classique ne sait pas représenter. On stocke donc un décalage depuis
//! minuit, plus un décalage UTC optionnel pour `time.tz`.

use std::fmt;

use crate::variable_types::StateValueError;

/// Décalage depuis minuit, avec fuseau optionnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    /// Secondes écoulées depuis minuit (0 ..= 86400)
    seconds: u32,

    /// Décalage UTC en secondes. `None` pour le type `time`.
    offset: Option<i32>,
}

impl TimeOfDay {
    pub const MAX_SECONDS: u32 = 24 * 3600;

    /// Construit une heure sans fuseau.
    pub fn new(seconds: u32) -> Result<Self, StateValueError> {
        if seconds > Self::MAX_SECONDS {
            return Err(StateValueError::RangeError(format!(
                "time of day {} exceeds 24:00:00",
                seconds
            )));
        }
        Ok(Self {
            seconds,
            offset: None,
        })
    }

    /// Construit une heure avec un décalage UTC en secondes.
    pub fn with_offset(seconds: u32, offset: i32) -> Result<Self, StateValueError> {
        let mut t = Self::new(seconds)?;
        t.offset = Some(offset);
        Ok(t)
    }

    pub fn seconds_from_midnight(&self) -> u32 {
        self.seconds
    }

    pub fn offset(&self) -> Option<i32> {
        self.offset
    }

    /// Parse la forme ISO8601 `hh[[:]mm[[:]ss]]` suivie d'un fuseau optionnel
    /// (`Z` ou `±HH[[:]MM]`). `allow_offset` distingue `time` de `time.tz`.
    pub fn parse(s: &str, allow_offset: bool) -> Result<Self, StateValueError> {
        let zone_index = s.find(['Z', '+', '-']);
        let (time_part, offset) = match zone_index {
            None => (s, None),
            Some(i) => {
                if !allow_offset {
                    return Err(StateValueError::ParseError(format!(
                        "time value '{}' contains unexpected timezone",
                        s
                    )));
                }
                (&s[..i], Some(parse_timezone(&s[i..])?))
            }
        };

        let (hour, minute, second) = parse_time_parts(time_part)?;
        if minute >= 60 || second >= 60 {
            return Err(StateValueError::RangeError(format!(
                "time value '{}' has minute or second out of range",
                s
            )));
        }
        let seconds = hour * 3600 + minute * 60 + second;
        if seconds > Self::MAX_SECONDS {
            return Err(StateValueError::RangeError(format!(
                "time value '{}' exceeds 24:00:00",
                s
            )));
        }

        Ok(Self { seconds, offset })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.seconds / 3600;
        let minute = (self.seconds % 3600) / 60;
        let second = self.seconds % 60;
        write!(f, "{:02}:{:02}:{:02}", hour, minute, second)?;

        match self.offset {
            None => Ok(()),
            Some(0) => write!(f, "Z"),
            Some(off) => {
                let (sign, off) = if off < 0 { ('-', -off) } else { ('+', off) };
                let mins = off / 60;
                write!(f, "{}{:02}:{:02}", sign, mins / 60, mins % 60)
            }
        }
    }
}

/// Parse `hh[[:]mm[[:]ss]]` (forme avec deux-points ou compacte).
pub(crate) fn parse_time_parts(s: &str) -> Result<(u32, u32, u32), StateValueError> {
    let digits: Vec<&str> = if s.contains(':') {
        s.split(':').collect()
    } else {
        match s.len() {
            2 => vec![&s[0..2]],
            4 => vec![&s[0..2], &s[2..4]],
            6 => vec![&s[0..2], &s[2..4], &s[4..6]],
            _ => {
                return Err(StateValueError::ParseError(format!(
                    "'{}' is not in ISO8601 time format",
                    s
                )));
            }
        }
    };
    if digits.is_empty() || digits.len() > 3 || digits.iter().any(|p| p.len() != 2) {
        return Err(StateValueError::ParseError(format!(
            "'{}' is not in ISO8601 time format",
            s
        )));
    }

    let mut parts = [0u32; 3];
    for (i, p) in digits.iter().enumerate() {
        parts[i] = p
            .parse::<u32>()
            .map_err(|e| StateValueError::ParseError(format!("'{}': {}", s, e)))?;
    }
    Ok((parts[0], parts[1], parts[2]))
}

/// Parse un fuseau ISO8601 : `Z` ou `±HH[[:]MM]`. Résultat en secondes.
pub(crate) fn parse_timezone(s: &str) -> Result<i32, StateValueError> {
    if s == "Z" {
        return Ok(0);
    }
    let bytes = s.as_bytes();
    if bytes.len() < 3 || (bytes[0] != b'+' && bytes[0] != b'-') {
        return Err(StateValueError::ParseError(format!(
            "'{}' is not in ISO8601 timezone format",
            s
        )));
    }
    let sign = if bytes[0] == b'-' { -1 } else { 1 };
    let rest = &s[1..];
    let (hh, mm) = match rest.len() {
        2 => (&rest[0..2], "0"),
        4 => (&rest[0..2], &rest[2..4]),
        5 if rest.as_bytes()[2] == b':' => (&rest[0..2], &rest[3..5]),
        _ => {
            return Err(StateValueError::ParseError(format!(
                "'{}' is not in ISO8601 timezone format",
                s
            )));
        }
    };
    let hours: i32 = hh
        .parse()
        .map_err(|e| StateValueError::ParseError(format!("'{}': {}", s, e)))?;
    let minutes: i32 = mm
        .parse()
        .map_err(|e| StateValueError::ParseError(format!("'{}': {}", s, e)))?;

    Ok(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_form() {
        let t = TimeOfDay::parse("12:15:10", false).unwrap();
        assert_eq!(t.seconds_from_midnight(), 12 * 3600 + 15 * 60 + 10);
        assert_eq!(t.offset(), None);
    }

    #[test]
    fn test_parse_compact_form() {
        let t = TimeOfDay::parse("121510", false).unwrap();
        assert_eq!(t.seconds_from_midnight(), 12 * 3600 + 15 * 60 + 10);
    }

    #[test]
    fn test_parse_partial_forms() {
        assert_eq!(
            TimeOfDay::parse("08", false).unwrap().seconds_from_midnight(),
            8 * 3600
        );
        assert_eq!(
            TimeOfDay::parse("08:30", false)
                .unwrap()
                .seconds_from_midnight(),
            8 * 3600 + 30 * 60
        );
    }

    #[test]
    fn test_midnight_upper_bound_inclusive() {
        let t = TimeOfDay::parse("24:00:00", false).unwrap();
        assert_eq!(t.seconds_from_midnight(), TimeOfDay::MAX_SECONDS);
        assert!(TimeOfDay::parse("24:00:01", false).is_err());
    }

    #[test]
    fn test_minute_second_bounds() {
        assert!(TimeOfDay::parse("10:60:00", false).is_err());
        assert!(TimeOfDay::parse("10:00:60", false).is_err());
    }

    #[test]
    fn test_timezone_forms() {
        assert_eq!(TimeOfDay::parse("10:00:00Z", true).unwrap().offset(), Some(0));
        assert_eq!(
            TimeOfDay::parse("10:00:00+02:00", true).unwrap().offset(),
            Some(7200)
        );
        assert_eq!(
            TimeOfDay::parse("10:00:00-0130", true).unwrap().offset(),
            Some(-(3600 + 1800))
        );
        assert_eq!(
            TimeOfDay::parse("10:00:00+05", true).unwrap().offset(),
            Some(5 * 3600)
        );
    }

    #[test]
    fn test_offset_rejected_for_plain_time() {
        assert!(TimeOfDay::parse("10:00:00+02:00", false).is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["00:00:00", "23:59:59", "24:00:00"] {
            let t = TimeOfDay::parse(s, false).unwrap();
            assert_eq!(t.to_string(), s);
        }
        let t = TimeOfDay::parse("10:00:00+02:00", true).unwrap();
        assert_eq!(t.to_string(), "10:00:00+02:00");
        let t = TimeOfDay::parse("10:00:00Z", true).unwrap();
        assert_eq!(t.to_string(), "10:00:00Z");
    }
}
