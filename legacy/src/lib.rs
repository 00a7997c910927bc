mod config;

pub use config::Config;
pub use config::MetadataBackend;

mod errors;
pub use errors::{Error, Result};

pub mod metadata;
pub mod objects;
