use crate::variable_types::{StateValue, StateVarType};

impl From<&StateValue> for StateVarType {
    fn from(v: &StateValue) -> Self {
        match v {
            StateValue::UI1(_) => StateVarType::UI1,
            StateValue::UI2(_) => StateVarType::UI2,
            StateValue::UI4(_) => StateVarType::UI4,
            StateValue::UI8(_) => StateVarType::UI8,
            StateValue::I1(_) => StateVarType::I1,
            StateValue::I2(_) => StateVarType::I2,
            StateValue::I4(_) => StateVarType::I4,
            StateValue::Int(_) => StateVarType::Int,
            StateValue::R4(_) => StateVarType::R4,
            StateValue::R8(_) => StateVarType::R8,
            StateValue::Number(_) => StateVarType::Number,
            StateValue::Fixed14_4(_) => StateVarType::Fixed14_4,
            StateValue::Float(_) => StateVarType::Float,
            StateValue::Char(_) => StateVarType::Char,
            StateValue::String(_) => StateVarType::String,
            StateValue::Boolean(_) => StateVarType::Boolean,
            StateValue::BinBase64(_) => StateVarType::BinBase64,
            StateValue::BinHex(_) => StateVarType::BinHex,
            StateValue::Date(_) => StateVarType::Date,
            StateValue::DateTime(_) => StateVarType::DateTime,
            StateValue::DateTimeTZ(_) => StateVarType::DateTimeTZ,
            StateValue::Time(_) => StateVarType::Time,
            StateValue::TimeTZ(_) => StateVarType::TimeTZ,
            StateValue::UUID(_) => StateVarType::UUID,
            StateValue::URI(_) => StateVarType::URI,
        }
    }
}

impl TryFrom<&StateValue> for i64 {
    type Error = crate::variable_types::StateValueError;

    fn try_from(v: &StateValue) -> Result<Self, Self::Error> {
        match v {
            StateValue::UI1(n) => Ok(*n as i64),
            StateValue::UI2(n) => Ok(*n as i64),
            StateValue::UI4(n) => Ok(*n as i64),
            StateValue::UI8(n) => i64::try_from(*n).map_err(|_| {
                crate::variable_types::StateValueError::ConversionError(format!(
                    "ui8 value {} does not fit in i64",
                    n
                ))
            }),
            StateValue::I1(n) => Ok(*n as i64),
            StateValue::I2(n) => Ok(*n as i64),
            StateValue::I4(n) => Ok(*n as i64),
            StateValue::Int(n) => Ok(*n),
            other => Err(crate::variable_types::StateValueError::ConversionError(
                format!("cannot convert {:?} to i64", StateVarType::from(other)),
            )),
        }
    }
}

impl TryFrom<&StateValue> for u64 {
    type Error = crate::variable_types::StateValueError;

    fn try_from(v: &StateValue) -> Result<Self, Self::Error> {
        match v {
            StateValue::UI1(n) => Ok(*n as u64),
            StateValue::UI2(n) => Ok(*n as u64),
            StateValue::UI4(n) => Ok(*n as u64),
            StateValue::UI8(n) => Ok(*n),
            other => Err(crate::variable_types::StateValueError::ConversionError(
                format!("cannot convert {:?} to u64", StateVarType::from(other)),
            )),
        }
    }
}

impl TryFrom<&StateValue> for f64 {
    type Error = crate::variable_types::StateValueError;

    fn try_from(v: &StateValue) -> Result<Self, Self::Error> {
        match v {
            StateValue::R4(n) => Ok(*n as f64),
            StateValue::R8(n) => Ok(*n),
            StateValue::Number(n) => Ok(*n),
            StateValue::Fixed14_4(n) => Ok(*n),
            StateValue::Float(n) => Ok(*n),
            StateValue::UI1(n) => Ok(*n as f64),
            StateValue::UI2(n) => Ok(*n as f64),
            StateValue::UI4(n) => Ok(*n as f64),
            StateValue::UI8(n) => Ok(*n as f64),
            StateValue::I1(n) => Ok(*n as f64),
            StateValue::I2(n) => Ok(*n as f64),
            StateValue::I4(n) => Ok(*n as f64),
            StateValue::Int(n) => Ok(*n as f64),
            other => Err(crate::variable_types::StateValueError::ConversionError(
                format!("cannot convert {:?} to f64", StateVarType::from(other)),
            )),
        }
    }
}
