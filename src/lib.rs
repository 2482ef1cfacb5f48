pub mod catalog;
pub mod config;
pub mod events;
pub mod polling;
pub mod queue;
pub mod schema;
pub mod telemetry;
