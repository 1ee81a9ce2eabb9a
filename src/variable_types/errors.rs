use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateValueError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Range error: {0}")]
    RangeError(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),
}
