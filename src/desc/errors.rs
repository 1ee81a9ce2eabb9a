use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    XmlWriteError(#[from] xmltree::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed description: {0}")]
    Malformed(String),

    #[error("Invalid description: {0:?}")]
    Invalid(Vec<String>),
}
