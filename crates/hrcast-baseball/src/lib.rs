// Library root: re-exports all modules so integration tests and the CLI can
// access the crate's public API.

pub mod ballpark;
pub mod chadwick;
pub mod config;
pub mod error;
pub mod player;
pub mod predict;
pub mod report;
pub mod scoring;
pub mod statcast;
pub mod weather;
