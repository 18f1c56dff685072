//! Response wrapper that preserves both decoded data and the exchange details.
//!
//! [`Response`] carries the decoded body together with the status, headers, raw body, latency,
//! the number of hosts contacted and the host that answered. Result-shaping functions passed
//! to [`Client::request`](crate::Client::request) receive a `Response<Value>` and usually pull a
//! single field out of it with [`Response::field`].

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// A successful response.
///
/// # Examples
///
/// ```no_run
/// use c8_client::{Client, Request};
///
/// # async fn example() -> Result<(), c8_client::Error> {
/// let client = Client::builder().url("https://gdn.example.com")?.build()?;
///
/// let response = client.send(Request::get("/_api/graph/social")).await?;
/// println!("Graph: {}", response.data["graph"]);
/// println!("Served by {} in {:?}", response.host, response.latency);
/// println!("Hosts contacted: {}", response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until the response was received, failovers included.
    pub latency: Duration,

    /// The number of hosts contacted; `1` unless the request failed over.
    pub attempts: usize,

    /// The host that answered, as `scheme://host:port`.
    pub host: String,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
        host: String,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
            host,
        }
    }

    /// Maps the response data to a different type using the provided function.
    ///
    /// ```
    /// # use c8_client::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    ///     "http://localhost:8529".to_string(),
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
            host: self.host,
        }
    }

    /// Returns `true` if the request had to fail over to another host.
    pub fn failed_over(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl Response<Value> {
    /// Deserializes the whole body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] if the body does not match `T`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.data).map_err(|e| Error::DeserializationFailed {
            raw_response: self.raw_body,
            serde_error: e.to_string(),
            status: self.status,
        })
    }

    /// Deserializes one top-level field of the body into `T`.
    ///
    /// ```
    /// # use c8_client::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     serde_json::json!({"removed": true}),
    ///     r#"{"removed":true}"#.to_string(),
    ///     StatusCode::ACCEPTED,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(3),
    ///     1,
    ///     "http://localhost:8529".to_string(),
    /// );
    /// let removed: bool = response.field("removed").unwrap();
    /// assert!(removed);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] if the field is missing or does not match `T`.
    pub fn field<T: DeserializeOwned>(mut self, name: &str) -> Result<T> {
        let value = match self.data.get_mut(name) {
            Some(value) => value.take(),
            None => {
                return Err(Error::DeserializationFailed {
                    raw_response: self.raw_body,
                    serde_error: format!("missing field `{}`", name),
                    status: self.status,
                })
            }
        };
        serde_json::from_value(value).map_err(|e| Error::DeserializationFailed {
            raw_response: self.raw_body,
            serde_error: e.to_string(),
            status: self.status,
        })
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(data: Value) -> Response<Value> {
        let raw_body = data.to_string();
        Response::new(
            data,
            raw_body,
            StatusCode::OK,
            HeaderMap::new(),
            Duration::from_millis(1),
            2,
            "https://b.example.com:443".to_string(),
        )
    }

    #[test]
    fn test_field_extracts_nested_value() {
        let names: Vec<String> = response(json!({"collections": ["people", "places"]}))
            .field("collections")
            .unwrap();
        assert_eq!(names, vec!["people", "places"]);
    }

    #[test]
    fn test_missing_field_is_deserialization_error() {
        let err = response(json!({"graph": {}}))
            .field::<Value>("vertex")
            .unwrap_err();
        match err {
            Error::DeserializationFailed { serde_error, raw_response, .. } => {
                assert!(serde_error.contains("vertex"));
                assert_eq!(raw_response, r#"{"graph":{}}"#);
            }
            other => panic!("Expected DeserializationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_field_on_non_object_is_missing() {
        assert!(response(Value::Null).field::<bool>("removed").is_err());
    }

    #[test]
    fn test_failed_over() {
        let response = response(Value::Null);
        assert!(response.failed_over());
        assert_eq!(response.host, "https://b.example.com:443");
    }
}
