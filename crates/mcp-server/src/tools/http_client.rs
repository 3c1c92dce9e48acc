//! Generic HTTP client tool

use async_trait::async_trait;
use capability_core::{
    Arguments, HandlerError, HandlerResult, ParameterSpec, ToolContent, ToolDescriptor, ToolUnit,
};
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const HTTP_CLIENT: &str = "http_client";

const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Response bodies are cut after this many bytes
const MAX_BODY_BYTES: usize = 10 * 1024;

/// Header names containing any of these are never echoed back
const SENSITIVE_HEADER_PARTS: [&str; 5] = ["auth", "key", "token", "secret", "pass"];

/// Sends HTTP requests and reports the response
pub struct HttpClientTool {
    client: Client,
    no_redirect_client: Client,
    default_timeout_secs: u64,
}

impl HttpClientTool {
    /// Create the tool; fails if no HTTP client can be built
    pub fn new(default_timeout_secs: u64) -> anyhow::Result<Self> {
        let user_agent = format!("ChatData-MCP-HttpClient/{}", env!("CARGO_PKG_VERSION"));

        let client = Client::builder().user_agent(&user_agent).build()?;
        let no_redirect_client = Client::builder()
            .user_agent(&user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            no_redirect_client,
            default_timeout_secs,
        })
    }

    async fn send(&self, request: HttpRequest) -> HandlerResult<String> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        info!("Sending HTTP request: {} {}", request.method, request.url);

        let mut builder = client
            .request(request.method.clone(), &request.url)
            .timeout(Duration::from_secs(request.timeout_secs))
            .header("Accept", "*/*");

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(json) = &request.json_data {
            builder = builder.json(json);
        } else if let Some(data) = &request.data {
            builder = builder.body(data.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HandlerError::Failed(format!(
                    "Request timed out after {}s",
                    request.timeout_secs
                ))
            } else {
                HandlerError::Failed(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let content_type = headers
            .iter()
            .find(|(name, _)| name == "content-type")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HandlerError::Failed(format!("Failed to read response: {}", e)))?;

        debug!("Response status: {}", status);

        let response = HttpResponse {
            status: status.to_string(),
            final_url,
            headers,
            body: format_body(&content_type, &bytes),
        };
        Ok(render_report(&request, &response))
    }
}

#[async_trait]
impl ToolUnit for HttpClientTool {
    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            HTTP_CLIENT,
            "Send an HTTP request and report the response",
        )
        .required("url", ParameterSpec::string("Request URL"))
        .optional(
            "method",
            ParameterSpec::string("HTTP method")
                .with_enum(METHODS)
                .with_default("GET"),
        )
        .optional("headers", ParameterSpec::object("Request headers"))
        .optional("params", ParameterSpec::object("URL query parameters"))
        .optional("data", ParameterSpec::string("Raw request body"))
        .optional("json_data", ParameterSpec::object("JSON request body"))
        .optional(
            "timeout",
            ParameterSpec::integer("Timeout in seconds").with_default(self.default_timeout_secs),
        )
        .optional(
            "follow_redirects",
            ParameterSpec::boolean("Follow redirects").with_default(true),
        )]
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
        if name != HTTP_CLIENT {
            return None;
        }

        let result = match HttpRequest::from_arguments(&arguments, self.default_timeout_secs) {
            Ok(request) => self.send(request).await,
            Err(err) => Err(err),
        };
        Some(result.map(|report| vec![ToolContent::text(report)]))
    }
}

/// A validated request
#[derive(Debug)]
struct HttpRequest {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    data: Option<String>,
    json_data: Option<Value>,
    timeout_secs: u64,
    follow_redirects: bool,
}

impl HttpRequest {
    fn from_arguments(arguments: &Arguments, default_timeout_secs: u64) -> HandlerResult<Self> {
        let url = arguments
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::invalid("Missing required argument 'url'"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(HandlerError::invalid(
                "URL must start with 'http://' or 'https://'",
            ));
        }

        let method_name = arguments
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_ascii_uppercase();
        if !METHODS.contains(&method_name.as_str()) {
            return Err(HandlerError::invalid(format!(
                "Unsupported HTTP method '{}', expected one of: {}",
                method_name,
                METHODS.join(", ")
            )));
        }
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|e| HandlerError::invalid(e.to_string()))?;

        let timeout_secs = match arguments.get("timeout").and_then(Value::as_u64) {
            Some(0) => return Err(HandlerError::invalid("Timeout must be positive")),
            Some(secs) => secs,
            None => default_timeout_secs,
        };

        Ok(Self {
            url: url.to_string(),
            method,
            headers: string_pairs(arguments.get("headers")),
            params: string_pairs(arguments.get("params")),
            data: arguments.get("data").and_then(Value::as_str).map(String::from),
            json_data: arguments.get("json_data").filter(|v| !v.is_null()).cloned(),
            timeout_secs,
            follow_redirects: arguments
                .get("follow_redirects")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        })
    }
}

struct HttpResponse {
    status: String,
    final_url: String,
    headers: Vec<(String, String)>,
    body: String,
}

/// Flatten a JSON object into string pairs, stringifying non-string values
fn string_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    value
        .and_then(Value::as_object)
        .map(|map: &Map<String, Value>| {
            map.iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn is_sensitive_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_HEADER_PARTS.iter().any(|part| name.contains(part))
}

/// Describe a response body for the report
fn format_body(content_type: &str, bytes: &[u8]) -> String {
    if content_type.contains("image/") || content_type.contains("application/octet-stream") {
        return format!("<binary data: {}, {} bytes>", content_type, bytes.len());
    }

    let truncated = bytes.len() > MAX_BODY_BYTES;
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_BODY_BYTES)]);

    let looks_json = content_type.contains("application/json")
        || text.trim_start().starts_with(['{', '[']);
    if looks_json && !truncated {
        if let Ok(json) = serde_json::from_str::<Value>(&text) {
            if let Ok(pretty) = serde_json::to_string_pretty(&json) {
                return format!("```json\n{}\n```", pretty);
            }
        }
    }

    if truncated {
        format!(
            "```\n{}...\n```\n\n<response truncated, full size: {} bytes>",
            text,
            bytes.len()
        )
    } else {
        format!("```\n{}\n```", text)
    }
}

fn render_report(request: &HttpRequest, response: &HttpResponse) -> String {
    let mut out = String::from("## HTTP Request Result\n\n### Request\n\n");
    out.push_str(&format!("**Method**: {}\n\n**URL**: {}\n\n", request.method, request.url));

    if !request.params.is_empty() {
        out.push_str(&format!("**Query parameters**:\n{}\n\n", json_block(&request.params)));
    }

    let safe_headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|(name, _)| !is_sensitive_header(name))
        .cloned()
        .collect();
    if !safe_headers.is_empty() {
        out.push_str(&format!("**Headers**:\n{}\n\n", json_block(&safe_headers)));
    }

    if let Some(json) = &request.json_data {
        let pretty = serde_json::to_string_pretty(json).unwrap_or_default();
        out.push_str(&format!("**Body (JSON)**:\n```json\n{}\n```\n\n", pretty));
    } else if let Some(data) = &request.data {
        if data.len() > 1000 {
            out.push_str(&format!("**Body**: <{} bytes>\n\n", data.len()));
        } else {
            out.push_str(&format!("**Body**:\n```\n{}\n```\n\n", data));
        }
    }

    out.push_str(&format!("### Response\n\n**Status**: {}\n\n", response.status));
    if response.final_url != request.url {
        out.push_str(&format!("**Final URL**: {}\n\n", response.final_url));
    }

    let safe_headers: Vec<(String, String)> = response
        .headers
        .iter()
        .filter(|(name, _)| !is_sensitive_header(name))
        .cloned()
        .collect();
    out.push_str(&format!("**Headers**:\n{}\n\n", json_block(&safe_headers)));

    out.push_str(&format!("### Body\n\n{}\n", response.body));
    out
}

fn json_block(pairs: &[(String, String)]) -> String {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    let pretty = serde_json::to_string_pretty(&map).unwrap_or_default();
    format!("```json\n{}\n```", pretty)
}
