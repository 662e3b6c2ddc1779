//! Shared result alias.
//!
//! Crates keep their own error enums; this alias only fixes the report type
//! so signatures read `Result<ChatOutcome, OrchestratorError>` instead of
//! spelling out `Report` everywhere.

use rootcause::Report;

/// Result carrying a rootcause [`Report`] whose current context is `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
