//! Builds an interactive activity map from GPX recordings filed as
//! `{ActivityType}/{group}/{name}.gpx`.

pub mod activity;
pub mod analysis;
pub mod cdn;
pub mod config;
pub mod error;
pub mod handler;
pub mod loader;
pub mod render;
pub mod storage;
pub mod summary;
pub mod tiles;
