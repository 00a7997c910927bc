//! `lodestone-storage` error handling. Mirrors `portfolio_objectstore::errors`'s pattern
//! of `#[from]`-wrapping every backend SDK error variant, then converting into
//! [`lodestone_core::Error`] at the [`crate::BlobStore`] trait boundary.
use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] http::Error),

    #[error("byte stream error: {0}")]
    ByteStream(#[from] aws_sdk_s3::primitives::ByteStreamError),

    #[error("aws sdk put object error: {0}")]
    AwsPutObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::put_object::PutObjectError>,
    ),
    #[error("aws sdk get object error: {0}")]
    AwsGetObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>,
    ),
    #[error("aws sdk head object error: {0}")]
    AwsHeadObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::head_object::HeadObjectError>,
    ),
    #[error("aws sdk delete object error: {0}")]
    AwsDeleteObject(
        #[from]
        aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::delete_object::DeleteObjectError>,
    ),
    #[error("aws sdk copy object error: {0}")]
    AwsCopyObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::copy_object::CopyObjectError>,
    ),
    #[error("aws sdk credentials error: {0}")]
    AwsCredentials(#[from] aws_credential_types::provider::error::CredentialsError),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),
}

impl From<Error> for lodestone_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(_) => lodestone_core::Error::NotFound,
            other => lodestone_core::Error::StorageError(other.to_string()),
        }
    }
}
