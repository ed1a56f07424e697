//! Response envelope decoding and classification
//!
//! Every reply carries `status`, an optional `message`, a `requestId` and a
//! `result` whose shape depends on the operation. The result is decoded once
//! into a [`Payload`] and then deserialized into the operation's typed view.

use crate::cluster::codec::Operation;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Message suffixes the cluster uses for objects that do not exist
const NOT_FOUND_SUFFIXES: [&str; 3] = ["t be found", "not found", "does not exist"];

// =============================================================================
// Status
// =============================================================================

/// Outer or per-item status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    /// Any other indicator, kept verbatim
    Error(String),
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ok" => Status::Ok,
            "warning" => Status::Warning,
            _ => Status::Error(s.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Status::from(s.as_str()))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "ok"),
            Status::Warning => write!(f, "warning"),
            Status::Error(s) => write!(f, "{}", s),
        }
    }
}

// =============================================================================
// Payload
// =============================================================================

/// Result of one target within a multi-target operation
#[derive(Debug, Clone, Deserialize)]
pub struct ItemResult {
    #[serde(default)]
    pub name: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub message: Option<String>,
}

impl ItemResult {
    fn describe(&self) -> String {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("status {}", self.status));
        match &self.name {
            Some(name) => format!("{}: {}", name, message),
            None => message,
        }
    }
}

/// Result payload shapes the cluster returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// No result
    Empty,
    /// A single nested object
    Object,
    /// Per-target results, each with its own status
    Items,
    /// Plain strings
    Strings,
    /// Objects without a status, e.g. ACL listings
    Records,
    /// Whatever the cluster sends
    Any,
}

/// Decoded `result` field
#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Object(serde_json::Map<String, JsonValue>),
    Items(Vec<ItemResult>),
    Strings(Vec<String>),
    Records(Vec<JsonValue>),
    Scalar(JsonValue),
}

impl Payload {
    fn shape(&self) -> Shape {
        match self {
            Payload::Empty => Shape::Empty,
            Payload::Object(_) => Shape::Object,
            Payload::Items(_) => Shape::Items,
            Payload::Strings(_) => Shape::Strings,
            Payload::Records(_) => Shape::Records,
            Payload::Scalar(_) => Shape::Any,
        }
    }

    fn infer(result: JsonValue, expected: &Shape) -> std::result::Result<Self, String> {
        match result {
            JsonValue::Null => Ok(Payload::Empty),
            JsonValue::Object(map) => Ok(Payload::Object(map)),
            JsonValue::Array(values) if values.is_empty() => Ok(match expected {
                Shape::Items => Payload::Items(Vec::new()),
                Shape::Strings => Payload::Strings(Vec::new()),
                Shape::Records => Payload::Records(Vec::new()),
                _ => Payload::Empty,
            }),
            JsonValue::Array(values) => {
                if values.iter().all(JsonValue::is_string) {
                    let strings = values
                        .into_iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect();
                    Ok(Payload::Strings(strings))
                } else if values.iter().all(|v| v.get("status").is_some_and(JsonValue::is_string))
                    && *expected != Shape::Records
                {
                    serde_json::from_value(JsonValue::Array(values))
                        .map(Payload::Items)
                        .map_err(|e| e.to_string())
                } else if values.iter().all(JsonValue::is_object) {
                    Ok(Payload::Records(values))
                } else {
                    Err("result list mixes value types".into())
                }
            }
            scalar => Ok(Payload::Scalar(scalar)),
        }
    }
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "requestId")]
    request_id: Option<String>,
    #[serde(default)]
    result: JsonValue,
}

/// How a well-formed reply should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// The addressed object does not exist; carries the cluster's message
    NotFound(String),
}

/// A decoded reply
#[derive(Debug, Clone)]
pub struct Envelope {
    pub operation: Operation,
    pub status: Status,
    pub message: Option<String>,
    pub request_id: Option<String>,
    pub payload: Payload,
}

/// Decode a raw body returned for `operation`.
///
/// The payload shape is only enforced on `ok` replies; warnings and errors
/// may carry whatever diagnostics the cluster attaches.
pub fn decode(operation: Operation, body: &str, expected: Shape) -> Result<Envelope> {
    let raw: RawEnvelope = serde_json::from_str(body).map_err(|e| Error::Decode {
        operation: operation.to_string(),
        reason: e.to_string(),
    })?;

    let status = raw.status.ok_or_else(|| Error::Decode {
        operation: operation.to_string(),
        reason: "missing status".into(),
    })?;

    let payload = Payload::infer(raw.result, &expected).map_err(|reason| Error::Decode {
        operation: operation.to_string(),
        reason,
    })?;

    if status == Status::Ok
        && expected != Shape::Any
        && payload.shape() != Shape::Empty
        && payload.shape() != expected
    {
        return Err(Error::Decode {
            operation: operation.to_string(),
            reason: format!("expected {:?} result, got {:?}", expected, payload.shape()),
        });
    }

    Ok(Envelope {
        operation,
        status,
        message: raw.message,
        request_id: raw.request_id,
        payload,
    })
}

/// Whether a cluster message reports a missing object
pub fn is_not_found_message(message: &str) -> bool {
    let normalized = message.trim().trim_end_matches('.').to_lowercase();
    NOT_FOUND_SUFFIXES
        .iter()
        .any(|suffix| normalized.ends_with(suffix))
}

impl Envelope {
    /// Classify the reply.
    ///
    /// Success requires an `ok` outer status and an `ok` status on every item.
    /// Failures whose message says the object is missing become
    /// [`Classification::NotFound`]; everything else is a rejection.
    pub fn classify(&self) -> Result<Classification> {
        match &self.status {
            Status::Ok => {
                let failed: Vec<&ItemResult> = self
                    .items()
                    .iter()
                    .filter(|item| item.status != Status::Ok)
                    .collect();

                if failed.is_empty() {
                    return Ok(Classification::Success);
                }

                let all_missing = failed
                    .iter()
                    .all(|item| item.message.as_deref().is_some_and(is_not_found_message));
                if all_missing {
                    return Ok(Classification::NotFound(failed[0].describe()));
                }

                let message = failed
                    .iter()
                    .filter(|item| !item.message.as_deref().is_some_and(is_not_found_message))
                    .map(|item| item.describe())
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(self.rejection(message))
            }
            Status::Warning
                if self
                    .message
                    .as_deref()
                    .is_some_and(is_not_found_message) =>
            {
                Ok(Classification::NotFound(
                    self.message.clone().unwrap_or_default(),
                ))
            }
            status => {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("status {}", status));
                Err(self.rejection(message))
            }
        }
    }

    fn rejection(&self, message: String) -> Error {
        Error::RemoteRejection {
            operation: self.operation.to_string(),
            message,
        }
    }

    fn decode_error(&self, reason: impl Into<String>) -> Error {
        Error::Decode {
            operation: self.operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Per-target results; empty for other shapes
    pub fn items(&self) -> &[ItemResult] {
        match &self.payload {
            Payload::Items(items) => items,
            _ => &[],
        }
    }

    /// Deserialize a single-object result
    pub fn object<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.payload {
            Payload::Object(map) => serde_json::from_value(JsonValue::Object(map.clone()))
                .map_err(|e| self.decode_error(e.to_string())),
            other => Err(self.decode_error(format!("expected an object result, got {:?}", other.shape()))),
        }
    }

    /// Deserialize a record-list result
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        match &self.payload {
            Payload::Records(values) => values
                .iter()
                .map(|v| serde_json::from_value(v.clone()))
                .collect::<std::result::Result<Vec<T>, _>>()
                .map_err(|e| self.decode_error(e.to_string())),
            Payload::Empty => Ok(Vec::new()),
            other => Err(self.decode_error(format!("expected a record list, got {:?}", other.shape()))),
        }
    }

    /// String-list result
    pub fn strings(&self) -> Result<&[String]> {
        match &self.payload {
            Payload::Strings(strings) => Ok(strings),
            Payload::Empty => Ok(&[]),
            other => Err(self.decode_error(format!("expected a string list, got {:?}", other.shape()))),
        }
    }
}
