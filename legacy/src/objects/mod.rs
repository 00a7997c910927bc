mod traits;

mod object_body;
pub use object_body::StreamObjectBody;

mod s3;
pub use s3::S3Config;
pub use s3::S3;

mod chunks;
pub use chunks::ChunkInfo;
pub use chunks::Part;
