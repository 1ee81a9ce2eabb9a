use std::cmp::Ordering;

use crate::{
    value_ranges::ValueRange,
    variable_types::{StateValue, StateValueError, StateVarType, UpnpVarType},
};

impl UpnpVarType for ValueRange {
    fn as_state_var_type(&self) -> StateVarType {
        self.min.as_state_var_type()
    }
}

impl ValueRange {
    /// Construit une plage. Les deux bornes doivent être du même type
    /// numérique et vérifier min <= max.
    pub fn new(
        min: &StateValue,
        max: &StateValue,
        step: Option<&StateValue>,
    ) -> Result<Self, StateValueError> {
        if min.as_state_var_type() != max.as_state_var_type() {
            return Err(StateValueError::TypeError(
                "min and max do not belong to the same type".to_string(),
            ));
        }
        if !min.is_numeric() {
            return Err(StateValueError::TypeError(format!(
                "range endpoints must be numeric, got {}",
                min.as_state_var_type()
            )));
        }

        if let Some(Ordering::Greater) = min.partial_cmp(max) {
            return Err(StateValueError::RangeError(
                "minimum cannot be greater than maximum".to_string(),
            ));
        }

        Ok(Self {
            min: min.clone(),
            max: max.clone(),
            step: step.cloned(),
        })
    }

    pub fn minimum(&self) -> &StateValue {
        &self.min
    }

    pub fn maximum(&self) -> &StateValue {
        &self.max
    }

    pub fn step(&self) -> Option<&StateValue> {
        self.step.as_ref()
    }

    pub fn contains(&self, value: &StateValue) -> bool {
        match (self.min.partial_cmp(value), self.max.partial_cmp(value)) {
            (Some(lo), Some(hi)) => lo != Ordering::Greater && hi != Ordering::Less,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(ValueRange::new(&StateValue::UI4(10), &StateValue::UI4(0), None).is_err());
    }

    #[test]
    fn test_rejects_mixed_types() {
        assert!(ValueRange::new(&StateValue::UI4(0), &StateValue::I4(10), None).is_err());
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert!(
            ValueRange::new(
                &StateValue::String("a".into()),
                &StateValue::String("z".into()),
                None
            )
            .is_err()
        );
    }

    #[test]
    fn test_contains_bounds_inclusive() {
        let range = ValueRange::new(&StateValue::UI4(0), &StateValue::UI4(10), None).unwrap();
        assert!(range.contains(&StateValue::UI4(0)));
        assert!(range.contains(&StateValue::UI4(10)));
        assert!(!range.contains(&StateValue::UI4(11)));
    }
}
