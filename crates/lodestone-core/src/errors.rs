//! Error taxonomy surfaced at the core boundary (spec §7).
//!
//! Every port (blob store, metadata store) and every format adapter returns its own
//! `thiserror` enum and converts into [`Error`] at the point where it crosses into
//! [`crate::registry::RegistryCoreService`] or [`crate::oci_session::OciSessionManager`].
//! `lodestone_http` is the only place these are mapped onto HTTP status codes.
use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("authentication required")]
    Unauthenticated,

    #[error("principal lacks required role")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("artifact already exists")]
    AlreadyExists,

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("format disabled")]
    FormatDisabled,

    #[error("digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: String, computed: String },

    #[error("range not satisfiable")]
    RangeNotSatisfiable,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable, lowercase identifier used in adapter-authored log lines and the generic
    /// `{"error": "..."}` JSON bodies non-OCI formats use (spec §7).
    pub fn kind_str(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::Forbidden => "forbidden",
            Error::NotFound => "not_found",
            Error::AlreadyExists => "already_exists",
            Error::InvalidContent(_) => "invalid_content",
            Error::InvalidRequest(_) => "invalid_request",
            Error::FormatDisabled => "format_disabled",
            Error::DigestMismatch { .. } => "digest_mismatch",
            Error::RangeNotSatisfiable => "range_not_satisfiable",
            Error::StorageError(_) => "storage_error",
            Error::DatabaseError(_) => "database_error",
            Error::Internal(_) => "internal",
        }
    }
}

/// Invalid digest string/algorithm errors, kept distinct from [`Error`] so that
/// [`crate::digest`] can be used independently of the rest of the core (mirrors
/// `portfolio_core::oci_digest` returning its own error variant set via `crate::Error`).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("invalid digest: {0}")]
    Invalid(String),
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl From<DigestError> for Error {
    fn from(e: DigestError) -> Self {
        Error::InvalidRequest(e.to_string())
    }
}
