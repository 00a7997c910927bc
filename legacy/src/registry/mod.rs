pub mod blobs;
pub mod metadata;
pub mod objects;

pub mod session;
pub use session::UploadSession;
pub use session::Chunk;
