use base64::Engine;
use base64::engine::general_purpose;
use std::fmt;

use crate::variable_types::StateValue;

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Numériques
            StateValue::UI1(v) => write!(f, "{}", v),
            StateValue::UI2(v) => write!(f, "{}", v),
            StateValue::UI4(v) => write!(f, "{}", v),
            StateValue::UI8(v) => write!(f, "{}", v),
            StateValue::I1(v) => write!(f, "{}", v),
            StateValue::I2(v) => write!(f, "{}", v),
            StateValue::I4(v) => write!(f, "{}", v),
            StateValue::Int(v) => write!(f, "{}", v),
            StateValue::R4(v) => write!(f, "{}", v),
            StateValue::R8(v) => write!(f, "{}", v),
            StateValue::Number(v) => write!(f, "{}", v),

            // Précision fixe : quatre décimales
            StateValue::Fixed14_4(v) => write!(f, "{:.4}", v),
            StateValue::Float(v) => write!(f, "{:.4}", v),

            // Types déjà Display
            StateValue::Char(v) => write!(f, "{}", v),
            StateValue::String(v) => write!(f, "{}", v),
            StateValue::UUID(v) => write!(f, "{}", v),
            StateValue::URI(v) => write!(f, "{}", v),

            // Booléen : 1 ou 0
            StateValue::Boolean(v) => write!(f, "{}", if *v { "1" } else { "0" }),

            // Encodages binaires
            StateValue::BinBase64(v) => write!(f, "{}", general_purpose::STANDARD.encode(v)),
            StateValue::BinHex(v) => write!(f, "{}", hex::encode(v)),

            // Dates et temps
            StateValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            StateValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S")),
            StateValue::DateTimeTZ(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%:z")),
            StateValue::Time(v) => write!(f, "{}", v),
            StateValue::TimeTZ(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable_types::StateVarType;

    #[test]
    fn test_boolean_marshals_as_digit() {
        assert_eq!(StateValue::Boolean(true).to_string(), "1");
        assert_eq!(StateValue::Boolean(false).to_string(), "0");
    }

    #[test]
    fn test_fixed_four_decimals() {
        let v = StateValue::parse(StateVarType::Fixed14_4, "12.5").unwrap();
        assert_eq!(v.to_string(), "12.5000");
    }

    #[test]
    fn test_base64_standard_alphabet() {
        let v = StateValue::BinBase64(vec![0xfb, 0xff]);
        // l'alphabet standard utilise '+' et '/', pas la variante URL-safe
        assert_eq!(v.to_string(), "+/8=");
    }
}
