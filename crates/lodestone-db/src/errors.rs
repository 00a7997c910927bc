//! `lodestone-db` error handling, grounded on `portfolio_backend_postgres::errors`'s
//! `#[from]`-wrapping of `sqlx`/`sea_query` errors.
use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("sqlx migrate error: {0}")]
    SqlxMigrate(#[from] sqlx::migrate::MigrateError),

    #[error("sea-query error: {0}")]
    SeaQuery(#[from] sea_query::error::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("transaction already committed or rolled back")]
    TransactionInactive,

    #[error("invalid stored digest: {0}")]
    InvalidDigest(String),
}

impl From<Error> for lodestone_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound => lodestone_core::Error::NotFound,
            Error::AlreadyExists => lodestone_core::Error::AlreadyExists,
            Error::Sqlx(sqlx::Error::Database(dberr)) if is_unique_violation(&*dberr) => {
                lodestone_core::Error::AlreadyExists
            }
            other => lodestone_core::Error::DatabaseError(other.to_string()),
        }
    }
}

fn is_unique_violation(dberr: &(dyn sqlx::error::DatabaseError + 'static)) -> bool {
    // Postgres SQLSTATE 23505 = unique_violation.
    dberr.code().as_deref() == Some("23505")
}
