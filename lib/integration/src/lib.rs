//! External service connectors for tool-agent.
//!
//! This crate provides:
//!
//! - **Web search**: the [`WebSearch`] connector trait consumed by the
//!   `search_web` tool
//! - **Exa**: an HTTP implementation of [`WebSearch`] backed by the Exa API

pub mod error;
pub mod exa;
pub mod search;

pub use error::ConnectorError;
pub use exa::{ExaClient, ExaConfig};
pub use search::{SearchHit, SearchRequest, WebSearch};
