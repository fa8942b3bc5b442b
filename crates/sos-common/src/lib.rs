//! SOS Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared building blocks for the species observation harvest workspace.
//!
//! - **Error Handling**: [`SosError`] and the crate-wide [`Result`] alias
//! - **Logging**: subscriber setup shared by every binary
//! - **Checksums**: SHA-256 digests for retained source packages
//!
//! # Example
//!
//! ```no_run
//! use sos_common::checksum::file_sha256;
//! use sos_common::Result;
//!
//! fn fingerprint(path: &str) -> Result<String> {
//!     file_sha256(path)
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, SosError};
