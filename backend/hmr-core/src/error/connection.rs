use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Task Error: {message} {location}")]
    Task {
        message: String,
        location: ErrorLocation,
    },
}

impl From<TungsteniteError> for ConnectionError {
    #[track_caller]
    fn from(error: TungsteniteError) -> Self {
        ConnectionError::Connect {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
