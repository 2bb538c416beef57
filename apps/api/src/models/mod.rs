pub mod candidate;
pub mod interview;
pub mod job;
pub mod offer;
pub mod organization;
