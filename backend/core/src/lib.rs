//! `advlog-core` - shared types for the advlog structured logger.
//!
//! Provides the numeric [`Level`] scale and the [`LogError`] taxonomy used
//! by the config loader and the logger itself.

pub mod error;
pub mod level;

pub use error::{LogError, Result};
pub use level::Level;
