use std::cmp::Ordering;

use crate::variable_types::{StateValue, StateVarType, type_trait::UpnpVarType};

impl UpnpVarType for StateValue {
    fn as_state_var_type(&self) -> StateVarType {
        StateVarType::from(self)
    }
}

impl StateValue {
    /// Vérifie que la valeur correspond exactement au tag donné.
    ///
    /// `Set` sur une cellule typée doit rejeter toute valeur dont le variant
    /// ne correspond pas au tag de la cellule.
    pub fn matches_type(&self, var_type: StateVarType) -> bool {
        self.as_state_var_type() == var_type
    }

    /// Valeur zéro du tag, au sens de la tolérance de parsing.
    pub fn is_zero(&self) -> bool {
        match self {
            StateValue::UI1(v) => *v == 0,
            StateValue::UI2(v) => *v == 0,
            StateValue::UI4(v) => *v == 0,
            StateValue::UI8(v) => *v == 0,
            StateValue::I1(v) => *v == 0,
            StateValue::I2(v) => *v == 0,
            StateValue::I4(v) => *v == 0,
            StateValue::Int(v) => *v == 0,
            StateValue::R4(v) => *v == 0.0,
            StateValue::R8(v) => *v == 0.0,
            StateValue::Number(v) => *v == 0.0,
            StateValue::Fixed14_4(v) => *v == 0.0,
            StateValue::Float(v) => *v == 0.0,
            StateValue::Char(_) => false,
            StateValue::String(v) => v.is_empty(),
            StateValue::Boolean(v) => !v,
            StateValue::BinBase64(v) => v.is_empty(),
            StateValue::BinHex(v) => v.is_empty(),
            StateValue::Date(v) => *v == chrono::NaiveDate::default(),
            StateValue::DateTime(v) => *v == chrono::NaiveDateTime::default(),
            StateValue::DateTimeTZ(v) => v.timestamp() == 0,
            StateValue::Time(v) => v.seconds_from_midnight() == 0,
            StateValue::TimeTZ(v) => v.seconds_from_midnight() == 0,
            StateValue::UUID(v) => v.is_nil(),
            StateValue::URI(_) => false,
        }
    }
}

impl PartialEq for StateValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_unsigned_int() && b.is_unsigned_int() => {
                match (u64::try_from(a), u64::try_from(b)) {
                    (Ok(ua), Ok(ub)) => ua == ub,
                    _ => false,
                }
            }
            (a, b) if a.is_integer() && b.is_integer() => {
                match (i64::try_from(a), i64::try_from(b)) {
                    (Ok(ia), Ok(ib)) => ia == ib,
                    _ => false,
                }
            }
            (a, b) if a.is_float() && b.is_float() => {
                match (f64::try_from(a), f64::try_from(b)) {
                    // NaN respecte la sémantique IEEE (NaN != NaN)
                    (Ok(fa), Ok(fb)) => fa == fb,
                    _ => false,
                }
            }
            (StateValue::Char(a), StateValue::Char(b)) => a == b,
            (StateValue::String(a), StateValue::String(b)) => a == b,
            (StateValue::Boolean(a), StateValue::Boolean(b)) => a == b,
            (StateValue::BinBase64(a), StateValue::BinBase64(b)) => a == b,
            (StateValue::BinHex(a), StateValue::BinHex(b)) => a == b,
            (StateValue::Date(a), StateValue::Date(b)) => a == b,
            (StateValue::DateTime(a), StateValue::DateTime(b)) => a == b,
            (StateValue::DateTimeTZ(a), StateValue::DateTimeTZ(b)) => a == b,
            (StateValue::Time(a), StateValue::Time(b)) => a == b,
            (StateValue::TimeTZ(a), StateValue::TimeTZ(b)) => a == b,
            (StateValue::UUID(a), StateValue::UUID(b)) => a == b,
            (StateValue::URI(a), StateValue::URI(b)) => a == b,
            (_, _) => false,
        }
    }
}

impl PartialOrd for StateValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (a, b) if a.is_unsigned_int() && b.is_unsigned_int() => {
                match (u64::try_from(a), u64::try_from(b)) {
                    (Ok(ua), Ok(ub)) => Some(ua.cmp(&ub)),
                    _ => None,
                }
            }
            (a, b) if a.is_integer() && b.is_integer() => {
                match (i64::try_from(a), i64::try_from(b)) {
                    (Ok(ia), Ok(ib)) => Some(ia.cmp(&ib)),
                    _ => None,
                }
            }
            (a, b) if a.is_numeric() && b.is_numeric() => {
                match (f64::try_from(a), f64::try_from(b)) {
                    (Ok(fa), Ok(fb)) => fa.partial_cmp(&fb),
                    _ => None,
                }
            }
            (StateValue::String(a), StateValue::String(b)) => Some(a.cmp(b)),
            (StateValue::Char(a), StateValue::Char(b)) => Some(a.cmp(b)),
            (StateValue::Date(a), StateValue::Date(b)) => Some(a.cmp(b)),
            (StateValue::DateTime(a), StateValue::DateTime(b)) => Some(a.cmp(b)),
            (StateValue::DateTimeTZ(a), StateValue::DateTimeTZ(b)) => Some(a.cmp(b)),
            (StateValue::Time(a), StateValue::Time(b)) => Some(a.cmp(b)),
            (StateValue::TimeTZ(a), StateValue::TimeTZ(b)) => Some(a.cmp(b)),
            (_, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_type_is_exact() {
        let v = StateValue::UI4(5);
        assert!(v.matches_type(StateVarType::UI4));
        assert!(!v.matches_type(StateVarType::UI2));
        assert!(!v.matches_type(StateVarType::Int));
    }

    #[test]
    fn test_numeric_comparison_across_widths() {
        assert_eq!(StateValue::UI1(5), StateValue::UI4(5));
        assert!(StateValue::UI2(3) < StateValue::UI4(4));
        assert!(StateValue::I1(-1) < StateValue::Int(0));
    }

    #[test]
    fn test_is_zero() {
        assert!(StateValue::UI4(0).is_zero());
        assert!(!StateValue::UI4(1).is_zero());
        assert!(StateValue::String(String::new()).is_zero());
        assert!(StateValue::Boolean(false).is_zero());
    }

    #[test]
    fn test_incomparable_kinds() {
        assert!(StateValue::UI4(1)
            .partial_cmp(&StateValue::String("1".into()))
            .is_none());
    }
}
