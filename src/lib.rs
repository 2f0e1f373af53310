//! AppHub backend
//!
//! Centralised logging, task tracking and review aggregation for a portfolio
//! of registered applications, with trend analytics, a weighted health score
//! and a process-wide stop/maintenance gate in front of every route.

pub mod config;
pub mod controllers;
pub mod db;
pub mod errors;
pub mod gate;
pub mod models;
pub mod notifier;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

pub use config::Config;
pub use errors::{ApiError, Result};
pub use gate::ServiceGate;
pub use state::AppState;
