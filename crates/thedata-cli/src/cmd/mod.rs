pub mod definitions;
pub mod schedule;
pub mod serve;
