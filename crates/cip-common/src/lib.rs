//! CIP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the CIP workspace.
//!
//! # Overview
//!
//! This crate provides the pieces every CIP workspace member needs:
//!
//! - **Error Handling**: the [`CipError`] taxonomy and [`Result`] alias
//! - **Logging**: env-driven `tracing` initialization with optional
//!   file rotation
//!
//! # Example
//!
//! ```no_run
//! use cip_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("worker started");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CipError, Result};
