//! Shared building blocks for the HMR workspace.
//!
//! Kept deliberately small: anything that more than one crate needs for
//! error reporting lives here so `hmr-core` and `hmr-watch` format failures
//! the same way.

pub mod error;
pub mod http_status;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;
