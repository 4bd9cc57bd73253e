//! Directive stream decoding.
//!
//! The response body is a multipart-like stream.  Chunks are inspected by
//! prefix only:
//!
//! - `------…` marks the start of the body format (arms keepalive).
//! - `Content-Type: application/json…` carries one JSON document between
//!   its first `{` and last `}`.
//! - everything else is ignored.
//!
//! Directive metadata is double-encoded: `resourceMetadata` is a JSON
//! string whose `payload` field is another JSON string.

use serde_json::Value;

use crate::types::Directive;

pub const BOUNDARY_PREFIX: &str = "------";
pub const JSON_PART_PREFIX: &str = "Content-Type: application/json";

/// What a single raw chunk is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    Boundary,
    Json(&'a str),
    Other,
}

pub fn classify(chunk: &str) -> Chunk<'_> {
    if chunk.starts_with(BOUNDARY_PREFIX) {
        Chunk::Boundary
    } else if chunk.starts_with(JSON_PART_PREFIX) {
        Chunk::Json(chunk)
    } else {
        Chunk::Other
    }
}

/// Failure at one decode stage.  The `Display` text carries the raw
/// message so it can be surfaced as-is.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not find json in chunk: {chunk}")]
    NoJson { chunk: String },

    #[error("could not parse json: {message}: {source}")]
    InvalidJson {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not find renderingUpdates in json: {message}")]
    MissingUpdates { message: String },

    #[error("could not find resourceMetadata in renderingUpdates[{index}]: {message}")]
    MissingMetadata { index: usize, message: String },

    #[error("could not parse resourceMetadata of renderingUpdates[{index}]: {source}: {message}")]
    InvalidMetadata {
        index: usize,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no command in resourceMetadata of renderingUpdates[{index}]: {message}")]
    MissingCommand { index: usize, message: String },

    #[error("no payload string for command {command}: {message}")]
    MissingPayload { command: String, message: String },

    #[error("could not parse payload of command {command}: {source}: {message}")]
    InvalidPayload {
        command: String,
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one JSON-bearing chunk.
///
/// A failure before the `renderingUpdates` array yields exactly one
/// `Err`.  Past that point every element decodes independently, so one
/// malformed update never hides its siblings.
pub fn decode_json_part(chunk: &str) -> Vec<Result<Directive, DecodeError>> {
    let (start, end) = match (chunk.find('{'), chunk.rfind('}')) {
        (Some(s), Some(e)) if e > s => (s, e),
        _ => {
            return vec![Err(DecodeError::NoJson {
                chunk: chunk.to_string(),
            })]
        }
    };
    let message = &chunk[start..=end];

    let data: Value = match serde_json::from_str(message) {
        Ok(v) => v,
        Err(source) => {
            return vec![Err(DecodeError::InvalidJson {
                message: message.to_string(),
                source,
            })]
        }
    };

    let Some(updates) = data
        .pointer("/directive/payload/renderingUpdates")
        .and_then(Value::as_array)
    else {
        return vec![Err(DecodeError::MissingUpdates {
            message: message.to_string(),
        })];
    };

    updates
        .iter()
        .enumerate()
        .map(|(index, update)| decode_update(index, update, message))
        .collect()
}

fn decode_update(index: usize, update: &Value, message: &str) -> Result<Directive, DecodeError> {
    let metadata = update
        .get("resourceMetadata")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingMetadata {
            index,
            message: message.to_string(),
        })?;

    let metadata: Value =
        serde_json::from_str(metadata).map_err(|source| DecodeError::InvalidMetadata {
            index,
            message: message.to_string(),
            source,
        })?;

    let command = metadata
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MissingCommand {
            index,
            message: message.to_string(),
        })?
        .to_string();

    let Some(raw_payload) = metadata.get("payload").and_then(Value::as_str) else {
        return Err(DecodeError::MissingPayload {
            command,
            message: message.to_string(),
        });
    };

    match serde_json::from_str(raw_payload) {
        Ok(payload) => Ok(Directive { command, payload }),
        Err(source) => Err(DecodeError::InvalidPayload {
            command,
            message: message.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Wrap rendering updates the way the dispatch service frames them.
    fn json_part(updates: Value) -> String {
        let doc = json!({
            "directive": {
                "header": { "namespace": "PushMessage", "name": "RenderingUpdate" },
                "payload": { "renderingUpdates": updates }
            }
        });
        format!("Content-Type: application/json\r\n\r\n{doc}\r\n")
    }

    fn update(command: &str, payload: Value) -> Value {
        let metadata = json!({ "command": command, "payload": payload.to_string() });
        json!({ "resourceId": "r1", "resourceMetadata": metadata.to_string() })
    }

    #[test]
    fn classify_by_prefix() {
        assert_eq!(classify("------abcdef\r\n"), Chunk::Boundary);
        assert!(matches!(classify("Content-Type: application/json\r\n{}"), Chunk::Json(_)));
        assert_eq!(classify("\r\n"), Chunk::Other);
        assert_eq!(classify(" ------"), Chunk::Other);
    }

    #[test]
    fn decodes_double_encoded_directive() {
        let chunk = json_part(json!([update("X", json!({ "a": 1 }))]));
        let out = decode_json_part(&chunk);
        assert_eq!(out.len(), 1);
        let directive = out.into_iter().next().unwrap().unwrap();
        assert_eq!(directive.command, "X");
        assert_eq!(directive.payload, json!({ "a": 1 }));
    }

    #[test]
    fn literal_metadata_string() {
        let chunk = r#"Content-Type: application/json

{"directive":{"payload":{"renderingUpdates":[{"resourceMetadata":"{\"command\":\"X\",\"payload\":\"{\\\"a\\\":1}\"}"}]}}}"#;
        let out = decode_json_part(chunk);
        let directive = out.into_iter().next().unwrap().unwrap();
        assert_eq!(directive.command, "X");
        assert_eq!(directive.payload, json!({ "a": 1 }));
    }

    #[test]
    fn multiple_updates_in_order() {
        let chunk = json_part(json!([
            update("PUSH_VOLUME_CHANGE", json!({ "volumeSetting": 30 })),
            update("PUSH_DOPPLER_CONNECTION_CHANGE", json!({ "dopplerConnectionState": "ONLINE" })),
        ]));
        let commands: Vec<_> = decode_json_part(&chunk)
            .into_iter()
            .map(|r| r.unwrap().command)
            .collect();
        assert_eq!(commands, vec!["PUSH_VOLUME_CHANGE", "PUSH_DOPPLER_CONNECTION_CHANGE"]);
    }

    #[test]
    fn missing_rendering_updates_is_one_error() {
        let chunk = "Content-Type: application/json\r\n\r\n{\"directive\":{\"payload\":{}}}";
        let out = decode_json_part(chunk);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(DecodeError::MissingUpdates { .. })));
    }

    #[test]
    fn rendering_updates_must_be_an_array() {
        let chunk = json_part(json!({ "not": "an array" }));
        let out = decode_json_part(&chunk);
        assert!(matches!(out[..], [Err(DecodeError::MissingUpdates { .. })]));
    }

    #[test]
    fn no_braces_is_reported_with_raw_chunk() {
        let chunk = "Content-Type: application/json\r\n\r\nnot json";
        let out = decode_json_part(chunk);
        let err = out.into_iter().next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::NoJson { .. }));
        assert!(err.to_string().contains("not json"));
    }

    #[test]
    fn invalid_json_is_reported() {
        let chunk = "Content-Type: application/json\r\n\r\n{\"directive\": }";
        let out = decode_json_part(chunk);
        assert!(matches!(out[..], [Err(DecodeError::InvalidJson { .. })]));
    }

    #[test]
    fn bad_sibling_does_not_hide_good_ones() {
        let chunk = json_part(json!([
            { "resourceId": "no-metadata" },
            update("GOOD", json!({ "ok": true })),
            { "resourceMetadata": "{not json" },
            { "resourceMetadata": json!({ "command": "P", "payload": "{oops" }).to_string() },
            { "resourceMetadata": json!({ "payload": "{}" }).to_string() },
            { "resourceMetadata": json!({ "command": "NOPAYLOAD" }).to_string() },
        ]));
        let out = decode_json_part(&chunk);
        assert_eq!(out.len(), 6);
        assert!(matches!(out[0], Err(DecodeError::MissingMetadata { index: 0, .. })));
        assert_eq!(out[1].as_ref().unwrap().command, "GOOD");
        assert!(matches!(out[2], Err(DecodeError::InvalidMetadata { index: 2, .. })));
        assert!(matches!(out[3], Err(DecodeError::InvalidPayload { .. })));
        assert!(matches!(out[4], Err(DecodeError::MissingCommand { index: 4, .. })));
        assert!(matches!(out[5], Err(DecodeError::MissingPayload { .. })));

        // Every failure carries the raw JSON document.
        let raw = &chunk[chunk.find('{').unwrap()..=chunk.rfind('}').unwrap()];
        for (i, outcome) in out.iter().enumerate() {
            if let Err(e) = outcome {
                assert!(e.to_string().ends_with(raw), "update {i}: {e}");
            }
        }
    }

    #[test]
    fn empty_updates_yield_nothing() {
        let chunk = json_part(json!([]));
        assert!(decode_json_part(&chunk).is_empty());
    }
}
