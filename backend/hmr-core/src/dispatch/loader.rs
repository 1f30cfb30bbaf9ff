//! Fetching updated module artifacts.

use crate::error::loader::LoaderError;

use common::{ErrorLocation, HttpStatusCode};

use std::future::Future;
use std::panic::Location;
use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Loads the artifact behind a cache-busted specifier (`<path>?t=<timestamp>`).
///
/// `Module` is whatever accept callbacks receive. Keeping it an associated
/// type lets hosts hand callbacks a typed module instead of raw bytes.
pub trait ModuleLoader: Send + Sync + 'static {
    type Module: Send + 'static;

    fn load(
        &self,
        specifier: &str,
    ) -> impl Future<Output = Result<Self::Module, LoaderError>> + Send;
}

/// A module artifact as served by the dev server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub specifier: String,
    pub url: Url,
    pub content_type: Option<String>,
    pub source: String,
}

/// Fetches modules over HTTP from the dev server.
#[derive(Clone)]
pub struct HttpModuleLoader {
    base_url: Url,
    client: Client,
}

impl HttpModuleLoader {
    /// # Errors
    ///
    /// [`LoaderError::Url`] if `base_url` does not parse, [`LoaderError::Request`]
    /// if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LoaderError> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a specifier, relative to the dev server root.
    pub fn resolve(&self, specifier: &str) -> Result<Url, LoaderError> {
        Ok(self.base_url.join(specifier)?)
    }
}

impl ModuleLoader for HttpModuleLoader {
    type Module = LoadedModule;

    async fn load(&self, specifier: &str) -> Result<LoadedModule, LoaderError> {
        let url = self.resolve(specifier)?;
        debug!("Fetching module {url}");

        let response = self.client.get(url.clone()).send().await?;

        let status = HttpStatusCode::from(response.status().as_u16());
        if !status.is_success() {
            if status.is_server_error() {
                warn!("Dev server failed to build {url} (HTTP {status})");
            } else if status.is_gone() {
                debug!("{url} no longer exists on the dev server");
            }
            return Err(LoaderError::Status {
                status,
                url: url.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let source = response.text().await?;

        Ok(LoadedModule {
            specifier: specifier.to_owned(),
            url,
            content_type,
            source,
        })
    }
}
