use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Malformed Frame Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Missing Type Error: {message} {location}")]
    MissingType {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Type Error: {tag} {location}")]
    UnknownType { tag: String, location: ErrorLocation },
}
