use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LoaderError {
    #[error("Module Url Error: {message} {location}")]
    Url {
        message: String,
        location: ErrorLocation,
    },

    #[error("Module Request Error: {message} {location}")]
    Request {
        message: String,
        location: ErrorLocation,
    },

    #[error("Module Status Error: HTTP {status} for {url} {location}")]
    Status {
        status: HttpStatusCode,
        url: String,
        location: ErrorLocation,
    },
}

impl From<reqwest::Error> for LoaderError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        LoaderError::Request {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for LoaderError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        LoaderError::Url {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
