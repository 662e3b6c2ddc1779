//! Core types shared by the tool-agent crates.
//!
//! This crate provides the run identifier used to correlate log output for a
//! single chat run, and the rootcause-based `Result` alias.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ChatRunId, ParseIdError};
