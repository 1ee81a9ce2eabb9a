use thiserror::Error;

use crate::variable_types::StateValueError;

#[derive(Error, Debug)]
pub enum StateVariableError {
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Value error: {0}")]
    Value(#[from] StateValueError),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}
