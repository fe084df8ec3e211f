pub mod memory_picture_repository;
pub mod sqlx_picture_repository;
