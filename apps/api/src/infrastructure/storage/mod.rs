pub mod memory_blob_store;
pub mod s3_blob_store;
pub mod traits;
