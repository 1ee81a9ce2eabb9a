use thiserror::Error;

use crate::state_variables::StateVariableError;
use crate::variable_types::StateValueError;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("No description for service id '{0}'")]
    UnknownService(String),

    #[error("Service id '{0}' is used multiple times")]
    DuplicateService(String),

    #[error("State variable '{var}' for argument '{arg}' of action '{action}' not found")]
    DanglingArgument {
        action: String,
        arg: String,
        var: String,
    },

    #[error("Duplicate action '{0}'")]
    DuplicateAction(String),

    #[error(transparent)]
    Variable(#[from] StateVariableError),

    #[error(transparent)]
    Value(#[from] StateValueError),
}
