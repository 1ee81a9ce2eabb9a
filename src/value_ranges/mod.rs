mod methods;

use crate::variable_types::StateValue;

/// Plage de valeurs autorisées d'une variable numérique.
#[derive(Debug, Clone)]
pub struct ValueRange {
    min: StateValue,
    max: StateValue,
    step: Option<StateValue>,
}
