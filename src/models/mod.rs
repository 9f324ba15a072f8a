pub mod comment;
pub mod dashboard;
pub mod project;
pub mod report;
pub mod stats;
pub mod task;
pub mod user;
