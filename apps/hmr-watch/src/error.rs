use common::ErrorLocation;

use hmr_core::HmrError;

use std::panic::Location;

use thiserror::Error;

/// Errors that end the `hmr-watch` process.
#[derive(Debug, Error)]
pub enum HmrWatchError {
    /// Startup failed before a client existed (directories, config).
    #[error("Startup Error: {message} {location}")]
    Startup {
        message: String,
        location: ErrorLocation,
    },

    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    /// Error from hmr-core (config validation, client construction, task failure)
    #[error("Client Error: {message} {location}")]
    Client {
        message: String,
        location: ErrorLocation,
    },

    /// The retry budget ran out; the dev server never came back.
    #[error("Gave Up Error: {message} {location}")]
    GaveUp {
        message: String,
        location: ErrorLocation,
    },
}

impl From<HmrError> for HmrWatchError {
    #[track_caller]
    fn from(error: HmrError) -> Self {
        HmrWatchError::Client {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
