//! Client for the remote text-generation service.
//!
//! Two wire dialects are spoken:
//!
//! | Dialect | Selected when | Payload | Extra headers |
//! |---|---|---|---|
//! | [`Dialect::Chat`] | host contains `openrouter.ai` | `{model, messages, max_output_tokens}` | `HTTP-Referer`, `X-Title` |
//! | [`Dialect::Completion`] | any other host | `{model, prompt}` | `Accept-Language: en` |
//!
//! Both ask for `{"title": "...", "body": ["paragraph", ...]}` and both
//! tolerate freeform text answers. Response interpretation lives in the pure
//! functions [`parse_chat_response`] and [`parse_completion_response`].

use super::{RemoteRewrite, RewriteBackend};
use crate::config::{DialectSetting, RewriteConfig};
use crate::error::{NewsError, Result};
use crate::text::condense_whitespace;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Token budget sent with chat requests.
pub const CHAT_MAX_OUTPUT_TOKENS: u32 = 1600;

const CHAT_SYSTEM_PROMPT: &str = "You rewrite full technology news articles in English. Your job is to produce entirely original wording: craft a new, unique headline and rewrite every paragraph so no sentences or phrasing are copied verbatim. Preserve factual accuracy, include all key details, and maintain a neutral, journalistic tone. Respond as compact JSON with the shape {\"title\": \"...\", \"body\": [\"paragraph 1\", \"paragraph 2\", ...]} without additional commentary.";

static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Wire format spoken to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Chat,
    Completion,
}

impl Dialect {
    /// Pick the dialect for `api_url`, honoring an explicit override.
    pub fn resolve(setting: DialectSetting, api_url: &str) -> Self {
        match setting {
            DialectSetting::Chat => Dialect::Chat,
            DialectSetting::Completion => Dialect::Completion,
            DialectSetting::Auto => Self::detect(api_url),
        }
    }

    /// `Chat` for OpenRouter-style endpoints, `Completion` otherwise.
    pub fn detect(api_url: &str) -> Self {
        let host = Url::parse(api_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));
        let is_openrouter = match host {
            Some(host) => host.contains("openrouter.ai"),
            None => api_url.to_ascii_lowercase().contains("openrouter.ai"),
        };
        if is_openrouter {
            Dialect::Chat
        } else {
            Dialect::Completion
        }
    }
}

fn chat_user_prompt(title: &str, body: &str) -> String {
    format!(
        "Rewrite the following technology news article. Provide a reworded headline that does not reuse the original phrasing, and rewrite every paragraph in new language while keeping all facts intact. Avoid copying sentences wholesale. Respond with JSON only.\n\nOriginal Title: {title}\n\nOriginal Article:\n{body}"
    )
}

fn completion_prompt(title: &str, body: &str) -> String {
    format!(
        "Rewrite the following technology news article for an English-speaking audience. Produce entirely new wording: craft a unique headline with different phrasing and rewrite every paragraph so the language is original while all facts, figures, and context remain accurate. Respond ONLY with a JSON object using this shape: {{\"title\": \"rewritten headline\", \"body\": [\"paragraph 1\", \"paragraph 2\", \"...\"]}}.\n\nOriginal Title: {title}\n\nOriginal Article:\n{body}"
    )
}

/// Request body for `dialect`.
pub fn build_payload(dialect: Dialect, model: &str, title: &str, body: &str) -> Value {
    match dialect {
        Dialect::Chat => json!({
            "model": model,
            "messages": [
                { "role": "system", "content": CHAT_SYSTEM_PROMPT },
                { "role": "user", "content": chat_user_prompt(title, body) },
            ],
            "max_output_tokens": CHAT_MAX_OUTPUT_TOKENS,
        }),
        Dialect::Completion => json!({
            "model": model,
            "prompt": completion_prompt(title, body),
        }),
    }
}

/// Loose truthiness: null, false, 0 and "" are absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|inner| is_present(inner))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parse `text` as JSON when it looks like JSON (starts with `{` or `[`).
pub fn parse_json_safe(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Flatten a rewritten body into blank-line separated paragraphs.
///
/// Arrays keep their non-empty string entries; strings get CRLF normalized,
/// blank-line runs capped at one and each line trimmed.
pub fn normalize_rewritten_body(body: &Value) -> String {
    match body {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        Value::String(text) => {
            let unix = text.replace("\r\n", "\n");
            let capped = EXTRA_NEWLINES.replace_all(&unix, "\n\n");
            capped
                .split('\n')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        }
        _ => String::new(),
    }
}

fn title_from(parsed: &Value, original_title: &str) -> String {
    let title = field(parsed, "title")
        .map(|title| value_to_text(title).trim().to_string())
        .unwrap_or_default();
    if title.is_empty() {
        original_title.to_string()
    } else {
        title
    }
}

/// Interpret a chat response: `choices[0].message.content` as a string or a
/// list of string / `{text}` segments. `None` when there is no message text.
pub fn parse_chat_response(response: &Value, original_title: &str) -> Option<RemoteRewrite> {
    let content = response.pointer("/choices/0/message/content")?;
    let text = match content {
        Value::String(text) => text.clone(),
        Value::Array(segments) => segments
            .iter()
            .map(|segment| match segment {
                Value::String(text) => text.as_str(),
                Value::Object(_) => segment.get("text").and_then(Value::as_str).unwrap_or(""),
                _ => "",
            })
            .collect(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    let rewrite = match parse_json_safe(&text).filter(Value::is_object) {
        Some(parsed) => RemoteRewrite {
            title: title_from(&parsed, original_title),
            body: field(&parsed, "body")
                .map(normalize_rewritten_body)
                .unwrap_or_else(|| condense_whitespace(&text)),
        },
        None => RemoteRewrite {
            title: original_title.to_string(),
            body: normalize_rewritten_body(&Value::String(text)),
        },
    };
    Some(rewrite)
}

/// Interpret a completion response: the first present of `rewrite`,
/// `content`, `text`. A JSON string is parsed, an object is used as is,
/// anything else is freeform body text.
pub fn parse_completion_response(response: &Value, original_title: &str) -> Option<RemoteRewrite> {
    let payload = ["rewrite", "content", "text"]
        .iter()
        .find_map(|key| field(response, key))?;

    let parsed = match payload {
        Value::String(text) => parse_json_safe(text),
        Value::Object(_) => Some(payload.clone()),
        _ => None,
    };

    let freeform = || match payload {
        Value::String(text) => condense_whitespace(text),
        _ => String::new(),
    };

    let rewrite = match parsed {
        Some(parsed) => RemoteRewrite {
            title: title_from(&parsed, original_title),
            body: field(&parsed, "body")
                .map(normalize_rewritten_body)
                .unwrap_or_else(freeform),
        },
        None => RemoteRewrite {
            title: original_title.to_string(),
            body: freeform(),
        },
    };
    Some(rewrite)
}

/// Interpret a response for `dialect`. A chat response without message text
/// falls through to the completion fields.
pub fn parse_response(dialect: Dialect, response: &Value, original_title: &str) -> Result<RemoteRewrite> {
    let parsed = match dialect {
        Dialect::Chat => parse_chat_response(response, original_title)
            .or_else(|| parse_completion_response(response, original_title)),
        Dialect::Completion => parse_completion_response(response, original_title),
    };
    parsed.ok_or_else(|| {
        NewsError::MalformedResponse(truncate_for_log(&response.to_string(), 200))
    })
}

#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    key: String,
}

/// HTTP client for the rewrite service.
///
/// Without both an endpoint URL and an API key the rewriter is disabled and
/// hands its input back unchanged.
#[derive(Debug, Clone)]
pub struct RemoteRewriter {
    client: Client,
    endpoint: Option<Endpoint>,
    dialect: Dialect,
    model: String,
    referrer: String,
    site_title: String,
}

impl RemoteRewriter {
    pub fn new(config: &RewriteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoint = match (config.api_url.as_deref(), config.api_key.as_deref()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some(Endpoint {
                    url: url.trim().to_string(),
                    key: key.trim().to_string(),
                })
            }
            _ => None,
        };

        let dialect = endpoint
            .as_ref()
            .map(|endpoint| Dialect::resolve(config.dialect, &endpoint.url))
            .unwrap_or(Dialect::Completion);

        if let Some(endpoint) = &endpoint {
            info!(url = %endpoint.url, ?dialect, model = %config.model, "Remote rewriting enabled");
        } else {
            info!("Remote rewriting disabled; local rewrite only");
        }

        Ok(Self {
            client,
            endpoint,
            dialect,
            model: config.model.clone(),
            referrer: config.referrer.clone(),
            site_title: config.site_title.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl RewriteBackend for RemoteRewriter {
    #[instrument(level = "info", skip_all, fields(dialect = ?self.dialect))]
    async fn rewrite(&self, title: &str, body: &str) -> Result<RemoteRewrite> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(RemoteRewrite {
                title: title.to_string(),
                body: body.to_string(),
            });
        };

        let t0 = Instant::now();
        let payload = build_payload(self.dialect, &self.model, title, body);
        let mut request = self
            .client
            .post(&endpoint.url)
            .bearer_auth(&endpoint.key)
            .json(&payload);
        request = match self.dialect {
            Dialect::Chat => request
                .header("HTTP-Referer", &self.referrer)
                .header("X-Title", &self.site_title),
            Dialect::Completion => request.header("Accept-Language", "en"),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %endpoint.url, "Rewrite endpoint returned an error status");
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: endpoint.url.clone(),
            });
        }

        let value: Value = response.json().await?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            response_preview = %truncate_for_log(&value.to_string(), 300),
            "Rewrite response received"
        );
        parse_response(self.dialect, &value, title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_detection() {
        assert_eq!(
            Dialect::detect("https://openrouter.ai/api/v1/chat/completions"),
            Dialect::Chat
        );
        assert_eq!(Dialect::detect("https://api.x.ai/v1/rewrite"), Dialect::Completion);
        assert_eq!(Dialect::detect("not a url openrouter.ai"), Dialect::Chat);
        assert_eq!(
            Dialect::resolve(DialectSetting::Chat, "https://api.x.ai/v1"),
            Dialect::Chat
        );
        assert_eq!(
            Dialect::resolve(DialectSetting::Completion, "https://openrouter.ai/api"),
            Dialect::Completion
        );
    }

    #[test]
    fn test_chat_payload_shape() {
        let payload = build_payload(Dialect::Chat, "xai/grok-2-latest", "Big news", "Body text");
        assert_eq!(payload["model"], "xai/grok-2-latest");
        assert_eq!(payload["max_output_tokens"], 1600);
        assert_eq!(payload["messages"][0]["role"], "system");
        let user = payload["messages"][1]["content"].as_str().unwrap();
        assert!(user.ends_with("Original Title: Big news\n\nOriginal Article:\nBody text"));
    }

    #[test]
    fn test_completion_payload_shape() {
        let payload = build_payload(Dialect::Completion, "m", "Big news", "Body text");
        assert!(payload.get("messages").is_none());
        let prompt = payload["prompt"].as_str().unwrap();
        assert!(prompt.contains(r#"{"title": "rewritten headline""#));
        assert!(prompt.ends_with("Original Article:\nBody text"));
    }

    #[test]
    fn test_parse_chat_json_content() {
        let response = json!({
            "choices": [{ "message": { "content": "{\"title\": \" New headline \", \"body\": [\" One \", \"\", \"Two\"]}" } }]
        });
        let parsed = parse_chat_response(&response, "Old").unwrap();
        assert_eq!(parsed.title, "New headline");
        assert_eq!(parsed.body, "One\n\nTwo");
    }

    #[test]
    fn test_parse_chat_segments_and_freeform() {
        let response = json!({
            "choices": [{ "message": { "content": ["Plain ", { "text": "answer\r\n\r\n\r\n  text " }, 7] } }]
        });
        let parsed = parse_chat_response(&response, "Old").unwrap();
        assert_eq!(parsed.title, "Old");
        assert_eq!(parsed.body, "Plain answer\n\ntext");
    }

    #[test]
    fn test_parse_chat_without_text_falls_through() {
        let response = json!({ "choices": [{ "message": { "content": "" } }], "text": "Fallback body" });
        assert!(parse_chat_response(&response, "Old").is_none());
        let parsed = parse_response(Dialect::Chat, &response, "Old").unwrap();
        assert_eq!(parsed.body, "Fallback body");
    }

    #[test]
    fn test_parse_completion_fields() {
        let response = json!({ "content": "{\"title\": \"T2\", \"body\": \"Line one\\n\\n\\n\\nLine two\"}" });
        let parsed = parse_completion_response(&response, "Old").unwrap();
        assert_eq!(parsed.title, "T2");
        assert_eq!(parsed.body, "Line one\n\nLine two");

        let object = json!({ "rewrite": { "title": "T3", "body": ["A", "B"] } });
        let parsed = parse_completion_response(&object, "Old").unwrap();
        assert_eq!(parsed.title, "T3");
        assert_eq!(parsed.body, "A\n\nB");

        let freeform = json!({ "rewrite": "", "text": "  Just   text  " });
        let parsed = parse_completion_response(&freeform, "Old").unwrap();
        assert_eq!(parsed.title, "Old");
        assert_eq!(parsed.body, "Just   text");
    }

    #[test]
    fn test_malformed_response_is_an_error() {
        let response = json!({ "unexpected": true });
        assert!(matches!(
            parse_response(Dialect::Completion, &response, "Old"),
            Err(NewsError::MalformedResponse(_))
        ));
        assert!(parse_response(Dialect::Chat, &json!({ "choices": [] }), "Old").is_err());
    }

    #[test]
    fn test_parse_json_safe() {
        assert!(parse_json_safe("  {\"a\": 1}").is_some());
        assert!(parse_json_safe("[1, 2]").is_some());
        assert!(parse_json_safe("{broken").is_none());
        assert!(parse_json_safe("plain").is_none());
    }

    #[tokio::test]
    async fn test_disabled_rewriter_echoes_input() {
        let rewriter = RemoteRewriter::new(&RewriteConfig::default()).unwrap();
        assert!(!rewriter.is_enabled());
        let result = rewriter.rewrite("Title", "Body").await.unwrap();
        assert_eq!(result.title, "Title");
        assert_eq!(result.body, "Body");
    }
}
