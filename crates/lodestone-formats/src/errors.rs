//! Per-adapter parsing errors, converted into [`lodestone_core::Error`] at the point
//! each adapter returns from [`lodestone_core::adapter::FormatAdapter::validate`]
//! (mirrors the crate-boundary conversion pattern in `lodestone_core::errors`).
use lodestone_core::Error as CoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("identifier mismatch: {0}")]
    IdentifierMismatch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<Error> for CoreError {
    fn from(e: Error) -> Self {
        CoreError::InvalidContent(e.to_string())
    }
}
