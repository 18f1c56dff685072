//! Translation of raw transport responses into decoded bodies or typed errors.

use crate::agent::TransportResponse;
use crate::error::codes;
use crate::{Error, ErrorEnvelope, Result};
use http::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;

/// The service's error document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceErrorBody {
    #[serde(default)]
    error: bool,
    error_num: Option<u32>,
    error_message: Option<String>,
}

/// A successfully translated response.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub data: Value,
    pub raw: TransportResponse,
}

/// Translates a raw response.
///
/// Status codes below 400 are successes: an empty body decodes to `null`, a non-JSON content
/// type to a JSON string, anything else must parse as JSON. Status 400 and above becomes
/// [`Error::Service`] when the body is a service error document and
/// [`Error::MalformedResponse`] otherwise.
pub(crate) fn translate(raw: TransportResponse) -> Result<Decoded> {
    if raw.status.as_u16() >= 400 {
        return Err(translate_failure(raw));
    }

    if raw.body.trim().is_empty() {
        return Ok(Decoded {
            data: Value::Null,
            raw,
        });
    }

    if !is_json(&raw) {
        let data = Value::String(raw.body.clone());
        return Ok(Decoded { data, raw });
    }

    match serde_json::from_str::<Value>(&raw.body) {
        Ok(data) => Ok(Decoded { data, raw }),
        Err(e) => {
            tracing::error!(
                error = %e,
                status = raw.status.as_u16(),
                raw_response = %raw.body,
                "Failed to parse response body"
            );
            Err(malformed(raw, e.to_string()))
        }
    }
}

fn translate_failure(raw: TransportResponse) -> Error {
    match serde_json::from_str::<ServiceErrorBody>(&raw.body) {
        Ok(body) if body.error || body.error_num.is_some() => {
            let envelope = ErrorEnvelope {
                status: raw.status,
                error_num: body.error_num.unwrap_or(codes::UNKNOWN),
                message: body
                    .error_message
                    .unwrap_or_else(|| status_reason(&raw)),
                raw_response: raw.body,
            };
            tracing::error!(
                status = envelope.status.as_u16(),
                error_num = envelope.error_num,
                message = %envelope.message,
                "Service error"
            );
            Error::Service(envelope)
        }
        Ok(_) => malformed(raw, "error response without an error document".to_string()),
        Err(e) => malformed(raw, e.to_string()),
    }
}

fn malformed(raw: TransportResponse, detail: String) -> Error {
    Error::MalformedResponse {
        envelope: ErrorEnvelope {
            status: raw.status,
            error_num: codes::UNKNOWN,
            message: status_reason(&raw),
            raw_response: raw.body,
        },
        detail,
    }
}

fn status_reason(raw: &TransportResponse) -> String {
    raw.status
        .canonical_reason()
        .unwrap_or("Unknown status")
        .to_string()
}

fn is_json(raw: &TransportResponse) -> bool {
    match raw.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(content_type) => content_type.to_ascii_lowercase().contains("json"),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, StatusCode};

    fn raw(status: u16, content_type: Option<&'static str>, body: &str) -> TransportResponse {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_success_json() {
        let decoded = translate(raw(200, Some("application/json"), r#"{"graph":{"name":"g"}}"#))
            .unwrap();
        assert_eq!(decoded.data["graph"]["name"], "g");
    }

    #[test]
    fn test_empty_success_is_null() {
        let decoded = translate(raw(204, None, "")).unwrap();
        assert_eq!(decoded.data, Value::Null);

        let decoded = translate(raw(304, Some("application/json"), "")).unwrap();
        assert_eq!(decoded.data, Value::Null);
    }

    #[test]
    fn test_text_success_is_string() {
        let decoded = translate(raw(200, Some("text/plain; charset=utf-8"), "pong")).unwrap();
        assert_eq!(decoded.data, Value::String("pong".to_string()));
    }

    #[test]
    fn test_unparseable_success_is_malformed() {
        let err = translate(raw(200, Some("application/json"), "{not json")).unwrap_err();
        match err {
            Error::MalformedResponse { envelope, .. } => {
                assert_eq!(envelope.error_num, codes::UNKNOWN);
                assert_eq!(envelope.raw_response, "{not json");
            }
            other => panic!("Expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_service_error_carries_code() {
        let body = r#"{"error":true,"errorNum":1202,"errorMessage":"document not found","code":404}"#;
        let err = translate(raw(404, Some("application/json"), body)).unwrap_err();
        assert!(!err.is_retryable());
        match err {
            Error::Service(envelope) => {
                assert_eq!(envelope.status, StatusCode::NOT_FOUND);
                assert_eq!(envelope.error_num, codes::DOCUMENT_NOT_FOUND);
                assert_eq!(envelope.message, "document not found");
            }
            other => panic!("Expected Service, got {:?}", other),
        }
    }

    #[test]
    fn test_error_flag_without_code_defaults_to_unknown() {
        let err = translate(raw(409, None, r#"{"error":true}"#)).unwrap_err();
        let envelope = err.envelope().unwrap();
        assert_eq!(envelope.error_num, codes::UNKNOWN);
        assert_eq!(envelope.message, "Conflict");
        assert!(matches!(err, Error::Service(_)));
    }

    #[test]
    fn test_non_document_error_is_malformed() {
        let err = translate(raw(502, Some("text/html"), "<html>Bad Gateway</html>")).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));

        let err = translate(raw(500, None, "")).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));

        let err = translate(raw(404, None, r#"{"message":"nope"}"#)).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_empty_error_body_keeps_status() {
        let err = translate(raw(404, None, "")).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.envelope().unwrap().error_num, codes::UNKNOWN);
        assert_eq!(err.error_num(), None);
    }
}
