pub mod nginx;
pub mod plan;
pub mod runner;
pub mod step;
