//! Caller-defined HTTP request tools.
//!
//! A `RequestToolSpec` describes one endpoint the agent may call: method,
//! templated URL, templated headers and body, a timeout, and the JSON schema
//! for the arguments the LLM must supply. Templates use `{name}`
//! placeholders filled from the LLM's arguments.
//!
//! Failed requests never abort the turn; the error lands in the step result
//! so the LLM can see it and recover.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use statecraft_core::error::ToolError;
use statecraft_core::tool::{Tool, ToolOutcome};

/// Response bodies are truncated to this many bytes before entering memory.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl RequestMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }

    fn allows_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

/// Wire descriptor for one HTTP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestToolSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub method: RequestMethod,

    /// URL template, e.g. `https://api.example.com/w?city={city}`.
    pub url: String,

    /// Header templates, rendered with the same arguments.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Body template; empty means no body.
    #[serde(default)]
    pub body: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// JSON schema for the arguments the LLM must provide.
    #[serde(default = "default_parameter_schema")]
    pub parameter_schema: Value,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_parameter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": [],
        "additionalProperties": false
    })
}

/// Fill `{name}` placeholders from the argument object. Strings are
/// substituted raw; other values via their JSON rendering.
fn render_template(template: &str, arguments: &Map<String, Value>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in arguments {
        let placeholder = format!("{{{key}}}");
        if !rendered.contains(&placeholder) {
            continue;
        }
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rendered = rendered.replace(&placeholder, &replacement);
    }
    rendered
}

/// Truncate to a byte budget without splitting a UTF-8 character.
fn truncate_response(body: &str) -> String {
    if body.len() <= MAX_RESPONSE_BYTES {
        return body.to_string();
    }
    let mut end = MAX_RESPONSE_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

/// An executable HTTP tool.
pub struct RequestTool {
    spec: RequestToolSpec,
    client: reqwest::Client,
}

impl RequestTool {
    pub fn new(spec: RequestToolSpec) -> Result<Self, statecraft_core::error::Error> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| statecraft_core::error::Error::Internal(e.to_string()))?;
        Ok(Self { spec, client })
    }

    pub fn spec(&self) -> &RequestToolSpec {
        &self.spec
    }
}

#[async_trait]
impl Tool for RequestTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn parameters_schema(&self) -> Value {
        self.spec.parameter_schema.clone()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutcome, ToolError> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected a JSON object, got {other}"
                )))
            }
        };

        let url = render_template(&self.spec.url, &arguments);
        debug!(tool = %self.spec.name, %url, "Executing request tool");

        let mut request = self
            .client
            .request(self.spec.method.as_reqwest(), &url)
            .timeout(std::time::Duration::from_millis(self.spec.timeout_ms));

        let mut has_content_type = false;
        for (key, template) in &self.spec.headers {
            if key.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            request = request.header(key, render_template(template, &arguments));
        }

        if self.spec.method.allows_body() && !self.spec.body.is_empty() {
            if !has_content_type {
                request = request.header("Content-Type", "application/json");
            }
            request = request.body(render_template(&self.spec.body, &arguments));
        }

        let response = match request.send().await {
            Ok(response) => response,
            // Transport failures are recoverable conversation state, not
            // crashes: the LLM sees the error in the step result.
            Err(e) => return Ok(ToolOutcome::err(String::new(), e.to_string())),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let content = truncate_response(&body);

        if status.is_success() {
            Ok(ToolOutcome::ok(content))
        } else {
            let reason = status.canonical_reason().unwrap_or("unknown");
            Ok(ToolOutcome::err(
                content,
                format!("{} {reason}", status.as_u16()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn render_substitutes_strings_raw() {
        let rendered = render_template(
            "https://example.com/w?city={city}",
            &args(&[("city", json!("Oslo"))]),
        );
        assert_eq!(rendered, "https://example.com/w?city=Oslo");
    }

    #[test]
    fn render_substitutes_non_strings_as_json() {
        let rendered = render_template(
            r#"{"count": {count}, "deep": {flag}}"#,
            &args(&[("count", json!(3)), ("flag", json!(true))]),
        );
        assert_eq!(rendered, r#"{"count": 3, "deep": true}"#);
    }

    #[test]
    fn render_ignores_unused_arguments_and_missing_keys() {
        let rendered = render_template("static", &args(&[("city", json!("Oslo"))]));
        assert_eq!(rendered, "static");

        let rendered = render_template("{missing}", &args(&[]));
        assert_eq!(rendered, "{missing}");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let short = "abc";
        assert_eq!(truncate_response(short), "abc");

        let long = "é".repeat(MAX_RESPONSE_BYTES);
        let truncated = truncate_response(&long);
        assert!(truncated.len() <= MAX_RESPONSE_BYTES);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn spec_defaults() {
        let spec: RequestToolSpec = serde_json::from_value(json!({
            "name": "weather",
            "method": "GET",
            "url": "https://example.com/w?city={city}",
        }))
        .unwrap();
        assert_eq!(spec.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(spec.parameter_schema["type"], "object");
        assert!(spec.headers.is_empty());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let result: Result<RequestToolSpec, _> = serde_json::from_value(json!({
            "name": "weather",
            "method": "TRACE",
            "url": "https://example.com",
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_object_arguments_are_invalid() {
        let tool = RequestTool::new(
            serde_json::from_value(json!({
                "name": "weather",
                "method": "GET",
                "url": "https://example.com",
            }))
            .unwrap(),
        )
        .unwrap();

        let err = tool.execute(json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unreachable_host_reports_transport_error() {
        let tool = RequestTool::new(
            serde_json::from_value(json!({
                "name": "weather",
                "method": "GET",
                // Reserved TEST-NET address, nothing listens there
                "url": "http://192.0.2.1:9/w",
                "timeout_ms": 50,
            }))
            .unwrap(),
        )
        .unwrap();

        let outcome = tool.execute(json!({})).await.unwrap();
        assert!(outcome.error.is_some());
        assert!(outcome.content.is_empty());
    }
}
