use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ConversionError;
use crate::storage_keys::storage_uri;

pub const STATUS_OK: u16 = 200;
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Fields an invocation event must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    Bucket,
    Key,
}

impl RequestField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Key => "key",
        }
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub bucket: String,
    pub key: String,
}

impl ConversionRequest {
    /// Extracts `bucket` and `key` from an invocation event.
    ///
    /// The event is either the bare `{bucket, key}` object or an API gateway
    /// envelope whose `body` holds that object (inline or as a JSON string).
    /// Top-level `bucket`/`key` win over an envelope, and a `null` body is no envelope.
    /// `bucket` is checked before `key`. Absent, `null` and empty fields are
    /// reported as missing; any other shape is an unexpected fault.
    pub fn from_event(event: Value) -> Result<Self, ConversionError> {
        let payload = normalize_event(event)?;
        let bucket = required_field(&payload, RequestField::Bucket)?;
        let key = required_field(&payload, RequestField::Key)?;
        Ok(Self { bucket, key })
    }

    pub fn input_location(&self) -> String {
        storage_uri(&self.bucket, &self.key)
    }
}

fn normalize_event(event: Value) -> Result<Map<String, Value>, ConversionError> {
    let Value::Object(mut object) = event else {
        return Err(ConversionError::Unexpected(
            "event must be a JSON object".to_string(),
        ));
    };

    // Top-level fields take precedence over any envelope.
    let has_top_level_fields = [RequestField::Bucket, RequestField::Key]
        .iter()
        .any(|field| object.contains_key(field.as_str()));
    if has_top_level_fields {
        return Ok(object);
    }

    let Some(body) = object.remove("body") else {
        return Ok(object);
    };

    match body {
        Value::Null => Ok(object),
        Value::Object(inner) => Ok(inner),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(inner)) => Ok(inner),
            Ok(_) => Err(ConversionError::Unexpected(
                "request body must be a JSON object".to_string(),
            )),
            Err(error) => Err(ConversionError::Unexpected(format!(
                "malformed JSON body: {error}"
            ))),
        },
        _ => Err(ConversionError::Unexpected(
            "request body must be a JSON object".to_string(),
        )),
    }
}

fn required_field(
    payload: &Map<String, Value>,
    field: RequestField,
) -> Result<String, ConversionError> {
    match payload.get(field.as_str()) {
        None | Some(Value::Null) => Err(ConversionError::MissingField { field }),
        Some(Value::String(text)) if text.is_empty() => {
            Err(ConversionError::MissingField { field })
        }
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(ConversionError::Unexpected(format!(
            "field '{field}' must be a string"
        ))),
    }
}

/// Payload of a successful conversion, serialized into the response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionSuccess {
    pub message: String,
    pub input_location: String,
    pub output_location: String,
}

impl ConversionSuccess {
    pub fn new(request: &ConversionRequest, output_key: &str) -> Self {
        Self {
            message: format!("Successfully converted {} to PNG", request.key),
            input_location: request.input_location(),
            output_location: storage_uri(&request.bucket, output_key),
        }
    }

    fn to_body(&self) -> String {
        json!({
            "message": self.message,
            "input_location": self.input_location,
            "output_location": self.output_location,
        })
        .to_string()
    }
}

/// Response returned to the invoking platform, exactly one per invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn success(payload: &ConversionSuccess) -> Self {
        Self {
            status_code: STATUS_OK,
            body: payload.to_body(),
        }
    }

    /// Error bodies are the error message encoded as a JSON string.
    pub fn from_error(error: &ConversionError) -> Self {
        Self {
            status_code: error.status_code(),
            body: Value::String(error.to_string()).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}
