pub mod config;
pub mod connection;
pub mod loader;
pub mod protocol;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HmrError {
    #[error(transparent)]
    Connection(#[from] connection::ConnectionError),

    #[error(transparent)]
    Loader(#[from] loader::LoaderError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
