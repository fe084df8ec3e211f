pub mod codec;
pub mod database;
pub mod repositories;
pub mod storage;
