//! HTTP status codes as seen by the module loader.

/// Status code of a module fetch.
///
/// Stored directly rather than parsed from error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpStatusCode(pub u16);

impl HttpStatusCode {
    /// 2xx: the artifact was served.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// 404/410: the dev server no longer has the module (renamed or deleted).
    pub fn is_gone(&self) -> bool {
        matches!(self.0, 404 | 410)
    }

    /// 5xx: the dev server failed while preparing the artifact.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl From<u16> for HttpStatusCode {
    fn from(code: u16) -> Self {
        HttpStatusCode(code)
    }
}

impl std::fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
