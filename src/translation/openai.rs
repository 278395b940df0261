//! Translator backed by an OpenAI-compatible `/responses` endpoint

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Result, TranslationError, Translator};
use crate::cards::Translation;
use crate::config::TranslatorConfig;

/// Longest English text sent per card, in characters
const MAX_TEXT_CHARS: usize = 800;

const MAX_OUTPUT_TOKENS: u32 = 1200;

/// Trim and cap a text before it goes into the prompt
pub fn clean_text(text: &str) -> String {
    text.trim().chars().take(MAX_TEXT_CHARS).collect()
}

#[derive(Debug, Serialize)]
struct PromptItem {
    id: i64,
    en: String,
}

fn build_prompt(payload: &[PromptItem]) -> Result<String> {
    Ok(format!(
        "You are a translation engine.\n\
         Translate each 'en' into Russian (ru) and Ukrainian (ukr).\n\
         Return ONLY valid JSON (no markdown, no explanations).\n\
         Keep translations concise. Preserve <br> tags if present.\n\n\
         Input JSON:\n{}\n\n\
         Output JSON MUST be an array of objects with EXACT keys: id, ru, ukr\n\
         Example:\n\
         [{{\"id\": 123, \"ru\": \"...\", \"ukr\": \"...\"}}, {{\"id\": 124, \"ru\": \"...\", \"ukr\": \"...\"}}]",
        serde_json::to_string(payload)?
    ))
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: String,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesReply {
    /// Concatenated model text, whichever shape the server used
    fn text(&self) -> String {
        if let Some(text) = &self.output_text {
            return text.clone();
        }
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull the `[{id, ru, ukr}, ...]` array out of raw model output.
///
/// Text around the array is ignored; entries without a usable id are
/// dropped; blank translations become `None`.
pub fn parse_translations(raw: &str) -> Result<HashMap<i64, Translation>> {
    let raw = raw.trim();
    let (start, end) = match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => {
            let snippet: String = raw.chars().take(400).collect();
            return Err(TranslationError::NoJsonArray(snippet));
        }
    };

    let entries: Vec<Value> = serde_json::from_str(&raw[start..=end])?;
    let mut out = HashMap::new();
    for entry in &entries {
        let Some(id) = parse_id(entry.get("id")) else {
            continue;
        };
        out.insert(
            id,
            Translation {
                ru: non_blank(entry.get("ru")),
                ukr: non_blank(entry.get("ukr")),
            },
        );
    }

    Ok(out)
}

/// HTTP translator for OpenAI-compatible APIs
pub struct OpenAiTranslator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiTranslator {
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(TranslationError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate_batch(&self, items: &[(i64, String)]) -> Result<HashMap<i64, Translation>> {
        let payload: Vec<PromptItem> = items
            .iter()
            .map(|(id, en)| PromptItem {
                id: *id,
                en: clean_text(en),
            })
            .filter(|item| !item.en.is_empty())
            .collect();

        if payload.is_empty() {
            return Ok(HashMap::new());
        }

        let request = ResponsesRequest {
            model: &self.model,
            input: build_prompt(&payload)?,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };

        log::debug!("Requesting translations for {} cards from {}", payload.len(), self.endpoint());
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ResponsesReply = response.json().await?;
        parse_translations(&reply.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use tokio::net::TcpListener;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  cat  "), "cat");
        assert_eq!(clean_text(&"x".repeat(1000)).len(), MAX_TEXT_CHARS);
        assert_eq!(clean_text(&"ё".repeat(900)).chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_parse_translations_with_prose() {
        let raw = r#"Here you go:
        [{"id": 1, "ru": "кошка", "ukr": "кішка"},
         {"id": "2", "ru": "  ", "ukr": "собака"},
         {"id": "oops", "ru": "x", "ukr": "y"}]
        Hope that helps."#;

        let parsed = parse_translations(raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&1].ru.as_deref(), Some("кошка"));
        assert_eq!(parsed[&1].ukr.as_deref(), Some("кішка"));
        assert_eq!(parsed[&2].ru, None);
        assert_eq!(parsed[&2].ukr.as_deref(), Some("собака"));
    }

    #[test]
    fn test_parse_translations_errors() {
        assert!(matches!(
            parse_translations("no array here"),
            Err(TranslationError::NoJsonArray(_))
        ));
        assert!(matches!(
            parse_translations("] backwards ["),
            Err(TranslationError::NoJsonArray(_))
        ));
        assert!(matches!(
            parse_translations("[not json]"),
            Err(TranslationError::Json(_))
        ));
    }

    #[test]
    fn test_reply_text_from_output_items() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "[{\"id\": 5,"},
                    {"type": "output_text", "text": " \"ru\": \"дом\", \"ukr\": \"дім\"}]"}
                ]}
            ]
        }))
        .unwrap();
        let parsed = parse_translations(&reply.text()).unwrap();
        assert_eq!(parsed[&5].ukr.as_deref(), Some("дім"));
    }

    #[test]
    fn test_requires_api_key() {
        let config = TranslatorConfig::default();
        assert!(matches!(
            OpenAiTranslator::new(&config),
            Err(TranslationError::MissingApiKey)
        ));
    }

    async fn fake_responses(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer sk-test");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"error": "bad key"})));
        }

        assert_eq!(body["model"], "test-model");
        let prompt = body["input"].as_str().unwrap_or_default();
        assert!(prompt.contains("\"en\":\"cat\""));
        assert!(!prompt.contains("\"id\":3"));

        (
            StatusCode::OK,
            Json(serde_json::json!({
                "output": [{"content": [{
                    "type": "output_text",
                    "text": "[{\"id\": 1, \"ru\": \"кошка\", \"ukr\": \"кішка\"}]"
                }]}]
            })),
        )
    }

    async fn start_fake_api() -> String {
        let app = Router::new().route("/v1/responses", post(fake_responses));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}/v1/", addr)
    }

    #[tokio::test]
    async fn test_translate_batch_over_http() {
        let base_url = start_fake_api().await;
        let config = TranslatorConfig {
            base_url: base_url.clone(),
            model: "test-model".to_string(),
            batch_size: 20,
            api_key: Some("sk-test".to_string()),
        };
        let translator = OpenAiTranslator::new(&config).unwrap();

        let items = vec![(1, "cat".to_string()), (3, "   ".to_string())];
        let result = translator.translate_batch(&items).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[&1].ru.as_deref(), Some("кошка"));

        let bad = OpenAiTranslator::new(&TranslatorConfig {
            api_key: Some("wrong".to_string()),
            ..config
        })
        .unwrap();
        assert!(matches!(
            bad.translate_batch(&items).await,
            Err(TranslationError::Api { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let translator = OpenAiTranslator::new(&TranslatorConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: Some("sk-test".to_string()),
            ..TranslatorConfig::default()
        })
        .unwrap();
        let result = translator.translate_batch(&[(1, "  ".to_string())]).await.unwrap();
        assert!(result.is_empty());
    }
}
