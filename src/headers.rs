//! Header composition.
//!
//! [`HeaderComposer`] freezes the client-wide defaults once, at build time, and produces a fresh
//! header map per call. Precedence from lowest to highest:
//!
//! 1. the content type implied by the request body,
//! 2. client defaults: static headers, then `authorization` and `x-c8-version`,
//! 3. headers supplied with the call.
//!
//! A higher layer replaces every value of a header name set by a lower one.

use crate::{Error, Result};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};

/// The header carrying the protocol version the client speaks.
pub const VERSION_HEADER: &str = "x-c8-version";

/// Credentials attached to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// No `authorization` header.
    #[default]
    None,
    /// `authorization: apikey <key>`.
    ApiKey(String),
    /// `authorization: bearer <token>`.
    Bearer(String),
}

impl Auth {
    fn header_value(&self) -> Result<Option<HeaderValue>> {
        let raw = match self {
            Auth::None => return Ok(None),
            Auth::ApiKey(key) => format!("apikey {}", key),
            Auth::Bearer(token) => format!("bearer {}", token),
        };
        let mut value = HeaderValue::try_from(raw)
            .map_err(|e| Error::ConfigurationError(format!("Invalid credentials: {}", e)))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}

/// Builds the final header set for each request.
#[derive(Debug, Clone)]
pub struct HeaderComposer {
    defaults: HeaderMap,
}

impl HeaderComposer {
    /// Freezes the client defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be encoded as a header value.
    pub fn new(static_headers: &HeaderMap, auth: &Auth, version: Option<u32>) -> Result<Self> {
        let mut defaults = static_headers.clone();
        if let Some(value) = auth.header_value()? {
            defaults.insert(AUTHORIZATION, value);
        }
        if let Some(version) = version {
            defaults.insert(
                HeaderName::from_static(VERSION_HEADER),
                HeaderValue::from(version),
            );
        }
        Ok(Self { defaults })
    }

    /// The frozen client defaults.
    pub fn defaults(&self) -> &HeaderMap {
        &self.defaults
    }

    /// Produces the header map for one call. Neither input is modified.
    ///
    /// ```
    /// use c8_client::headers::{Auth, HeaderComposer};
    /// use http::{HeaderMap, HeaderValue};
    ///
    /// let mut config = HeaderMap::new();
    /// config.insert("x-one", HeaderValue::from_static("1"));
    /// let composer = HeaderComposer::new(&config, &Auth::None, None).unwrap();
    ///
    /// let mut call = HeaderMap::new();
    /// call.insert("x-one", HeaderValue::from_static("2"));
    /// assert_eq!(composer.compose(&call, None)["x-one"], "2");
    /// ```
    pub fn compose(&self, call: &HeaderMap, content_type: Option<HeaderValue>) -> HeaderMap {
        let mut composed = HeaderMap::with_capacity(self.defaults.len() + call.len() + 1);
        if let Some(content_type) = content_type {
            composed.insert(CONTENT_TYPE, content_type);
        }
        overlay(&mut composed, &self.defaults);
        overlay(&mut composed, call);
        composed
    }
}

fn overlay(target: &mut HeaderMap, layer: &HeaderMap) {
    for name in layer.keys() {
        target.remove(name);
    }
    for (name, value) in layer.iter() {
        target.append(name.clone(), value.clone());
    }
}
