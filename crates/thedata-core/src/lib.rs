pub mod asset;
pub mod definitions;
pub mod error;
pub mod graph;
pub mod job;
pub mod repository;
pub mod schedule;

pub use error::{DataError, Result};
