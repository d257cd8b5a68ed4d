// HTTP request and response types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: String, path: String) -> Self {
        Self {
            method,
            path,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Shorthand for a GET request to `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET".to_string(), path.into())
    }

    /// Shorthand for a HEAD request to `path`
    pub fn head(path: impl Into<String>) -> Self {
        Self::new("HEAD".to_string(), path.into())
    }

    /// Get a request header by name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Set a header, builder-style
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_modified() -> Self {
        Self::new(304)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// Plain text response with charset
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .with_body(body.into().into_bytes())
            .content_type("text/plain; charset=utf-8")
    }

    /// HTML response with charset
    pub fn html(body: impl Into<String>) -> Self {
        Self::ok()
            .with_body(body.into().into_bytes())
            .content_type("text/html; charset=utf-8")
    }

    /// JSON response from any serializable value
    pub fn json<T: Serialize>(value: &T) -> Result<Self, crate::Error> {
        let body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        Ok(Self::ok()
            .with_body(body)
            .content_type("application/json"))
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.with_header("Content-Type", value)
    }

    /// Get a response header by name
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }
}
