// Route template expansion.
// Turns "GET /orgs/{org}/members" plus an options map into a concrete request.

use reqwest::Method;
use serde_json::{Map, Value};

use crate::error::{ReportError, Result};

/// Options key whose object value is sent as request headers.
const HEADERS_OPTION: &str = "headers";

/// A route template resolved against its options.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Route {
    /// Expand a template. Placeholders consume their option; leftovers become
    /// query parameters for GET/HEAD/DELETE and the JSON body otherwise.
    pub fn expand(template: &str, options: &Map<String, Value>) -> Result<Self> {
        let invalid = |reason: &str| ReportError::InvalidRoute {
            route: template.to_string(),
            reason: reason.to_string(),
        };

        let template = template.trim();
        let (method, raw_path) = match template.split_once(' ') {
            Some((method, path)) => {
                let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map_err(|_| invalid("unknown HTTP method"))?;
                (method, path.trim())
            }
            None => (Method::GET, template),
        };
        if !raw_path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }

        let mut remaining = options.clone();
        let mut path = String::with_capacity(raw_path.len());
        let mut rest = raw_path;
        while let Some(start) = rest.find('{') {
            let end = rest[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or_else(|| invalid("unclosed placeholder"))?;
            let name = &rest[start + 1..end];
            let value = remaining
                .remove(name)
                .ok_or_else(|| invalid(&format!("missing value for {{{}}}", name)))?;
            path.push_str(&rest[..start]);
            path.push_str(&encode_segment(&value_to_string(&value)));
            rest = &rest[end + 1..];
        }
        path.push_str(rest);

        let headers = match remaining.remove(HEADERS_OPTION) {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, value)| (name.clone(), value_to_string(value)))
                .collect(),
            Some(_) => return Err(invalid("headers option must be an object")),
            None => Vec::new(),
        };

        let (query, body) = if [Method::GET, Method::HEAD, Method::DELETE].contains(&method) {
            let query = remaining
                .iter()
                .map(|(name, value)| (name.clone(), value_to_string(value)))
                .collect();
            (query, None)
        } else if remaining.is_empty() {
            (Vec::new(), None)
        } else {
            (Vec::new(), Some(Value::Object(remaining)))
        };

        Ok(Self {
            method,
            path,
            query,
            headers,
            body,
        })
    }
}

/// Render a JSON value as a URL parameter. Strings lose their quotes.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Percent-encode a single path segment.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
