pub mod audit;
pub mod health;
pub mod pictures;
pub mod tags;
