pub mod endpoints;
pub mod types;
