//! Wire protocol spoken by the dev server on the HMR socket.
//!
//! Every frame is a single JSON text message tagged by a `type` field:
//!
//! ```text
//! {"type":"Connected"}
//! {"type":"Ping"}
//! {"type":"Update","updates":[{"type":"JsUpdate","path":"/app.js","timestamp":42}]}
//! {"type":"FullReload"}
//! {"type":"Error"}
//! ```
//!
//! The variant set is closed. [`decode`] rejects anything else with a
//! [`ProtocolError`] instead of guessing.

use crate::MODULE_TIMESTAMP_QUERY;
use crate::error::protocol::ProtocolError;

use common::ErrorLocation;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator field carried by every frame.
const TYPE_FIELD: &str = "type";

/// Tags understood by this client.
const KNOWN_TYPES: [&str; 5] = ["Connected", "Ping", "Update", "FullReload", "Error"];

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HmrPayload {
    /// Greeting sent once per socket.
    Connected,

    /// Liveness signal, carries nothing.
    Ping,

    /// One or more changed artifacts, in the order the server observed them.
    Update { updates: Vec<UpdatePayload> },

    /// The server cannot describe the change incrementally.
    FullReload,

    /// Server-side failure (build error and the like).
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl HmrPayload {
    /// Wire tag of this variant, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            HmrPayload::Connected => "Connected",
            HmrPayload::Ping => "Ping",
            HmrPayload::Update { .. } => "Update",
            HmrPayload::FullReload => "FullReload",
            HmrPayload::Error { .. } => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateKind {
    JsUpdate,
    CssUpdate,
}

/// A single changed artifact inside an `Update` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayload {
    #[serde(rename = "type")]
    pub kind: UpdateKind,

    /// Module path as served by the dev server. Also the registry key.
    pub path: String,

    /// Milliseconds since the epoch at which the change was seen.
    pub timestamp: u64,
}

impl UpdatePayload {
    pub fn is_code(&self) -> bool {
        self.kind == UpdateKind::JsUpdate
    }

    /// Cache-busted specifier used to fetch this artifact.
    pub fn specifier(&self) -> String {
        module_specifier(&self.path, self.timestamp)
    }
}

/// Builds `<path>?t=<timestamp>`.
///
/// The timestamp defeats any cache between the client and the dev server so
/// each update yields a freshly evaluated module.
pub fn module_specifier(path: &str, timestamp: u64) -> String {
    format!("{path}?{MODULE_TIMESTAMP_QUERY}={timestamp}")
}

/// Decodes one text frame.
///
/// # Errors
///
/// - [`ProtocolError::Malformed`] - not JSON, not an object, or a known tag with the wrong shape
/// - [`ProtocolError::MissingType`] - no string `type` field
/// - [`ProtocolError::UnknownType`] - a `type` outside the closed variant set
///
/// Errors carry the location of the caller.
#[track_caller]
pub fn decode(text: &str) -> Result<HmrPayload, ProtocolError> {
    let location = ErrorLocation::caller();

    let value: Value = serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
        message: format!("Frame is not valid JSON: {e}"),
        location,
    })?;

    let object = value.as_object().ok_or_else(|| ProtocolError::Malformed {
        message: format!("Frame is not a JSON object: {value}"),
        location,
    })?;

    let tag = object
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::MissingType {
            message: format!("Frame has no string '{TYPE_FIELD}' field"),
            location,
        })?
        .to_owned();

    if !KNOWN_TYPES.contains(&tag.as_str()) {
        return Err(ProtocolError::UnknownType { tag, location });
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed {
        message: format!("Invalid {tag} frame: {e}"),
        location,
    })
}
