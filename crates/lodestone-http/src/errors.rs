//! Maps [`lodestone_core::Error`] onto HTTP (spec §7 "User-visible mapping"). Two bodies
//! are produced depending on router: OCI uses the `{errors:[{code,message}]}` envelope
//! (`oci_spec::distribution::ErrorResponse`), everything else gets a plain `{"error":
//! "..."}` JSON object, mirroring `portfolio_http::errors` splitting on `BlobError`/
//! `ManifestError`/`RepositoryError` vs. a generic fallback.
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

use oci_spec::distribution::{ErrorCode as DistributionErrorCode, ErrorInfoBuilder, ErrorResponseBuilder};

use lodestone_core::Error as CoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("http invalid header value")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("missing path parameter: {0}")]
    MissingPathParameter(&'static str),

    #[error("missing query parameter: {0}")]
    MissingQueryParameter(&'static str),

    #[error("invalid query parameter {0}: {1}")]
    InvalidQueryParameter(&'static str, String),

    #[error("{0}")]
    Core(#[from] CoreError),
}

#[derive(Debug, Serialize)]
struct SimpleErrorBody {
    error: String,
}

/// Generic error shape used by every non-OCI router (spec §7 "other formats use simple
/// `{error: \"message\"}` JSON with appropriate HTTP status").
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Core(e) => simple_error_response(status_for_core(&e), e.to_string()),
            Error::MissingPathParameter(_)
            | Error::MissingQueryParameter(_)
            | Error::InvalidQueryParameter(..) => {
                simple_error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::InvalidHeaderValue(_) => {
                simple_error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}

fn simple_error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(SimpleErrorBody { error: message })).into_response()
}

fn status_for_core(e: &CoreError) -> StatusCode {
    match e {
        CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden => StatusCode::FORBIDDEN,
        CoreError::NotFound => StatusCode::NOT_FOUND,
        CoreError::AlreadyExists => StatusCode::CONFLICT,
        CoreError::InvalidContent(_) | CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        CoreError::FormatDisabled => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::DigestMismatch { .. } => StatusCode::BAD_REQUEST,
        CoreError::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
        CoreError::StorageError(_) | CoreError::DatabaseError(_) | CoreError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// OCI's distribution-spec error envelope, used only by [`crate::oci`] handlers (spec §7).
/// `NotFound` is ambiguous at the core level (could mean blob, manifest, or session); each
/// call site picks the right `DistributionErrorCode` via [`OciError::manifest`]/
/// [`OciError::blob`]/[`OciError::session`] rather than guessing from the error variant alone.
pub struct OciError {
    status: StatusCode,
    code: DistributionErrorCode,
    message: String,
}

impl OciError {
    pub fn manifest(e: CoreError) -> Self {
        Self::with_not_found_code(e, DistributionErrorCode::ManifestUnknown)
    }

    pub fn blob(e: CoreError) -> Self {
        Self::with_not_found_code(e, DistributionErrorCode::BlobUnknown)
    }

    pub fn session(e: CoreError) -> Self {
        Self::with_not_found_code(e, DistributionErrorCode::BlobUploadUnknown)
    }

    fn with_not_found_code(e: CoreError, not_found_code: DistributionErrorCode) -> Self {
        let (status, code) = oci_status_and_code(&e, not_found_code);
        Self {
            status,
            code,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for OciError {
    fn into_response(self) -> Response {
        let info = ErrorInfoBuilder::default()
            .code(self.code)
            .message(self.message)
            .build()
            .expect("all required ErrorInfo fields must be initialized");
        let response = ErrorResponseBuilder::default()
            .errors(vec![info])
            .build()
            .expect("all required ErrorResponse fields must be initialized");
        (self.status, axum::Json(response)).into_response()
    }
}

fn oci_status_and_code(
    e: &CoreError,
    not_found_code: DistributionErrorCode,
) -> (StatusCode, DistributionErrorCode) {
    match e {
        CoreError::Unauthenticated => (StatusCode::UNAUTHORIZED, DistributionErrorCode::Unauthorized),
        CoreError::Forbidden => (StatusCode::FORBIDDEN, DistributionErrorCode::Denied),
        CoreError::NotFound => (StatusCode::NOT_FOUND, not_found_code),
        CoreError::AlreadyExists => (StatusCode::CONFLICT, DistributionErrorCode::NameInvalid),
        CoreError::InvalidContent(_) => (StatusCode::BAD_REQUEST, DistributionErrorCode::ManifestInvalid),
        CoreError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, DistributionErrorCode::NameInvalid),
        CoreError::FormatDisabled => {
            (StatusCode::SERVICE_UNAVAILABLE, DistributionErrorCode::Denied)
        }
        CoreError::DigestMismatch { .. } => {
            (StatusCode::BAD_REQUEST, DistributionErrorCode::DigestInvalid)
        }
        CoreError::RangeNotSatisfiable => {
            (StatusCode::RANGE_NOT_SATISFIABLE, DistributionErrorCode::BlobUploadInvalid)
        }
        CoreError::StorageError(_) | CoreError::DatabaseError(_) | CoreError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, DistributionErrorCode::Unsupported)
        }
    }
}
