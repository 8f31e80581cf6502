//! Cap-table report server library.
//!
//! Report descriptors with ETA calibration, the ordering resolver, the
//! render pipeline, the pre-render sweep and the HTTP API serving them.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
