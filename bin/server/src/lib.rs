//! HTTP API for the tool-calling chat agent.
//!
//! Exposes one orchestrator per process behind `POST /chat`, plus liveness
//! routes. See [`app::router`].

pub mod app;
pub mod config;
pub mod error;
pub mod types;
