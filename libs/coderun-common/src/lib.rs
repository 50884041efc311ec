pub mod config;
pub mod endpoints;
pub mod status;
pub mod types;
pub mod wire;
