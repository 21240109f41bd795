// Schema normalization: arbitrary stored documents -> canonical `Resume`.
// Pure functions only; no I/O and no dependency on editor state.

mod canonical;
mod credential;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::resume::Resume;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// The two document shapes the normalizer understands.
#[derive(Debug, Clone, Copy)]
pub enum DocumentShape<'a> {
    /// A Verifiable-Credential envelope with resume facts in `credentialSubject`.
    Credential {
        envelope: &'a Map<String, Value>,
        subject: &'a Map<String, Value>,
    },
    /// An already canonical, or partially canonical, resume document.
    Canonical(&'a Map<String, Value>),
}

impl<'a> DocumentShape<'a> {
    pub fn detect(raw: &'a Value) -> Result<Self, NormalizeError> {
        let root = as_root(raw)?;
        match root.get("credentialSubject") {
            None | Some(Value::Null) => Ok(DocumentShape::Canonical(root)),
            Some(Value::Object(subject)) => Ok(DocumentShape::Credential {
                envelope: root,
                subject,
            }),
            Some(other) => Err(NormalizeError::InvalidInput(format!(
                "credentialSubject must be an object, got {}",
                json_type(other)
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentShape::Credential { .. } => "credential",
            DocumentShape::Canonical(_) => "canonical",
        }
    }
}

/// Normalizes any stored document into a fully defaulted `Resume`.
/// Missing fields never fail; only a non-object root is rejected.
pub fn normalize(raw: &Value) -> Result<Resume, NormalizeError> {
    normalize_at(raw, Utc::now())
}

/// Like [`normalize`], with an explicit "now" used for timestamp defaults.
pub fn normalize_at(raw: &Value, now: DateTime<Utc>) -> Result<Resume, NormalizeError> {
    let shape = DocumentShape::detect(raw)?;
    debug!("Normalizing {} document", shape.label());
    Ok(match shape {
        DocumentShape::Credential { envelope, subject } => {
            credential::from_credential(envelope, subject, now)
        }
        DocumentShape::Canonical(doc) => canonical::from_canonical(doc, now),
    })
}

/// Normalizes content that is already expected to be canonical, skipping
/// credential detection. Used for resumes picked from the unsigned list.
pub fn normalize_canonical(raw: &Value) -> Result<Resume, NormalizeError> {
    let root = as_root(raw)?;
    Ok(canonical::from_canonical(root, Utc::now()))
}

fn as_root(raw: &Value) -> Result<&Map<String, Value>, NormalizeError> {
    raw.as_object().ok_or_else(|| {
        NormalizeError::InvalidInput(format!(
            "document root must be an object, got {}",
            json_type(raw)
        ))
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Lenient readers shared by both branches. A value of the wrong JSON type
// counts as absent.

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_default()
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn timestamp(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}
