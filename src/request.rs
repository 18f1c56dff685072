//! Request descriptors.
//!
//! A [`Request`] is everything the dispatcher needs to know about one logical call: method,
//! path, query parameters, per-call headers and body. It is built by the caller, handed to
//! [`Client::send`](crate::Client::send) by value and never changed once dispatch starts.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;

/// The payload of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A JSON document, sent as `application/json`.
    Json(Value),
    /// Plain text, sent as `text/plain`.
    Text(String),
    /// Pre-encoded bytes. The caller supplies the content type through the request headers,
    /// e.g. a multipart encoder's `{headers, body}` pair.
    Raw(Vec<u8>),
}

impl Body {
    /// The content type implied by the body, if any.
    pub(crate) fn content_type(&self) -> Option<HeaderValue> {
        match self {
            Body::Json(_) => Some(HeaderValue::from_static("application/json")),
            Body::Text(_) => Some(HeaderValue::from_static("text/plain")),
            Body::Empty | Body::Raw(_) => None,
        }
    }

    /// Encodes the body for the wire.
    pub(crate) fn encode(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Body::Empty => Ok(None),
            Body::Json(value) => serde_json::to_vec(value)
                .map(Some)
                .map_err(|e| Error::SerializationFailed(e.to_string())),
            Body::Text(text) => Ok(Some(text.clone().into_bytes())),
            Body::Raw(bytes) => Ok(Some(bytes.clone())),
        }
    }
}

/// A single logical call against the service.
///
/// Paths are relative to the selected fabric (`/_fabric/{name}`) unless the request was built
/// with [`Request::absolute`].
///
/// # Examples
///
/// ```
/// use c8_client::Request;
///
/// let request = Request::get("/_api/graph/social/vertex/people/alice")
///     .with_query_param("rev", "_XqlOdo----");
/// assert_eq!(request.query_params.len(), 1);
/// assert!(!request.absolute_path);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,

    /// The request path.
    pub path: String,

    /// Per-call headers. These override client defaults of the same name.
    pub headers: HeaderMap,

    /// Query parameters, sent in insertion order.
    pub query_params: Vec<(String, String)>,

    /// The request payload.
    pub body: Body,

    /// When `true` the path is used as-is instead of being placed under the fabric prefix.
    pub absolute_path: bool,
}

impl Request {
    /// Creates a fabric-scoped request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: Body::Empty,
            absolute_path: false,
        }
    }

    /// Creates a request whose path is not placed under the fabric prefix.
    pub fn absolute(method: Method, path: impl Into<String>) -> Self {
        Self {
            absolute_path: true,
            ..Self::new(method, path)
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for a `PUT` request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a `PATCH` request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Shorthand for a `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Merges a prepared header map, e.g. the headers of a multipart payload.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Adds every field of a serializable options struct as a query parameter.
    ///
    /// `null` fields are skipped; nested values are sent as JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` does not serialize to a JSON object.
    pub fn with_query<T: Serialize + ?Sized>(mut self, options: &T) -> Result<Self> {
        let value =
            serde_json::to_value(options).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        match value {
            Value::Null => Ok(self),
            Value::Object(fields) => {
                for (key, field) in fields {
                    if let Some(text) = query_value(&field) {
                        self.query_params.push((key, text));
                    }
                }
                Ok(self)
            }
            other => Err(Error::SerializationFailed(format!(
                "query options must be an object, got {}",
                other
            ))),
        }
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        nested => Some(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SaveOptions {
        wait_for_sync: Option<bool>,
        return_new: Option<bool>,
    }

    #[test]
    fn test_query_from_options_skips_nulls() {
        let request = Request::post("/_api/document/orders")
            .with_query(&SaveOptions {
                wait_for_sync: Some(true),
                return_new: None,
            })
            .unwrap();

        assert_eq!(
            request.query_params,
            vec![("waitForSync".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_query_rejects_non_objects() {
        let result = Request::get("/x").with_query(&json!([1, 2]));
        assert!(matches!(result, Err(Error::SerializationFailed(_))));
    }

    #[test]
    fn test_json_body_implies_content_type() {
        let request = Request::post("/_api/graph").with_json(&json!({"name": "social"})).unwrap();
        assert_eq!(
            request.body.content_type(),
            Some(HeaderValue::from_static("application/json"))
        );
        assert_eq!(
            request.body.encode().unwrap(),
            Some(br#"{"name":"social"}"#.to_vec())
        );
    }

    #[test]
    fn test_raw_body_has_no_implied_content_type() {
        let body = Body::Raw(b"--boundary".to_vec());
        assert_eq!(body.content_type(), None);
        assert_eq!(Body::Empty.encode().unwrap(), None);
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = Request::get("/x").with_header("bad header", "1");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }
}
