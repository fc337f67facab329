//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Live auction commands for the operator and the display
pub mod auction;

/// General utility commands
pub mod general;

/// Post-auction corrections, team and player management, export and audit
pub mod manage;

// Export commands
pub use auction::*;
pub use general::*;
pub use manage::*;
