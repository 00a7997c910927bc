use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    LayerBuilderError(String),

    #[error("{0}")]
    ImageBuilderError(String),

    #[error("{0}")]
    IndexBuilderError(String),

    #[error("{0}")]
    CoreError(#[from] lodestone_core::Error),

    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),
}
