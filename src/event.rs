//! HTTP-like event and response envelopes used by the function gateway.
//!
//! The hosting runtime delivers each invocation as a JSON object with
//! `httpMethod`, `body` and `queryStringParameters`, and expects a
//! `{statusCode, headers, body}` object back. Handlers never touch raw
//! sockets; they are pure functions over these two types.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming gateway event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEvent {
    #[serde(default, rename = "httpMethod")]
    pub http_method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "queryStringParameters")]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl ApiEvent {
    /// HTTP method of the invocation. The gateway omits the field for some
    /// trigger types; treat that as GET, like the original runtime does.
    pub fn method(&self) -> &str {
        self.http_method.as_deref().unwrap_or("GET")
    }

    /// Parse the request body as JSON. A missing or empty body parses as `{}`.
    pub fn json_body(&self) -> Result<Value> {
        let raw = match self.body.as_deref() {
            None | Some("") => "{}",
            Some(s) => s,
        };
        serde_json::from_str(raw).context("request body is not valid JSON")
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }
}

/// Outgoing gateway response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    /// 200 response with a JSON body and permissive CORS.
    pub fn ok(body: &Value) -> Self {
        Self {
            status_code: 200,
            headers: json_headers(),
            body: body.to_string(),
        }
    }

    /// Error response with an `{"error": ...}` JSON body.
    pub fn error(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            headers: json_headers(),
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    /// CORS pre-flight acknowledgement: 200, empty body, no Content-Type.
    pub fn preflight(allowed_methods: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Access-Control-Allow-Origin".to_string(),
            "*".to_string(),
        );
        headers.insert(
            "Access-Control-Allow-Methods".to_string(),
            allowed_methods.to_string(),
        );
        headers.insert(
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        );
        Self {
            status_code: 200,
            headers,
            body: String::new(),
        }
    }
}

fn json_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert(
        "Access-Control-Allow-Origin".to_string(),
        "*".to_string(),
    );
    headers
}
