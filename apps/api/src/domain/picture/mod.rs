pub mod codec;
pub mod entity;
pub mod errors;
pub mod recompute;
pub mod repository;
pub mod stage;
pub mod value_objects;
