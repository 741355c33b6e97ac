// src/lib.rs
pub mod checks;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
