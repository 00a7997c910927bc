mod traits;
pub use traits::ObjectStore;

mod object_body;
pub use object_body::StreamObjectBody;

mod s3;
pub use s3::S3Config;
pub use s3::S3;
