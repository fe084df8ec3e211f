pub mod picture;
pub mod shared;
