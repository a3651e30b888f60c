use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Translate `text` into the language named by an ISO 639 code.
///
/// The request is chat-completion shaped; the response decoder also accepts the
/// common dedicated-translation-API shapes so gateway deployments keep working.
pub async fn translate(
	cfg: &forage_config::TranslationProviderConfig,
	text: &str,
	target_language: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let instruction = format!(
		"Translate the user message into the language with ISO 639 code {target_language:?}. Reply with only the translation."
	);
	let body = serde_json::json!({
		"model": cfg.model,
		"messages": [
			{ "role": "system", "content": instruction },
			{ "role": "user", "content": text },
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_translation_response(json)
}

fn parse_translation_response(json: Value) -> Result<String> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return non_empty(content);
	}
	if let Some(content) = json
		.get("translations")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|item| item.get("text"))
		.and_then(|c| c.as_str())
	{
		return non_empty(content);
	}
	if let Some(content) = json
		.get("data")
		.and_then(|data| data.get("translations"))
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|item| item.get("translatedText"))
		.and_then(|c| c.as_str())
	{
		return non_empty(content);
	}
	if let Some(content) = json.get("translatedText").and_then(|c| c.as_str()) {
		return non_empty(content);
	}
	if let Some(content) = json.get("text").and_then(|c| c.as_str()) {
		return non_empty(content);
	}

	Err(Error::InvalidResponse {
		message: "Translation response shape is not recognized.".to_string(),
	})
}

fn non_empty(content: &str) -> Result<String> {
	let trimmed = content.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidResponse {
			message: "Translation response was empty.".to_string(),
		});
	}

	Ok(trimmed.to_string())
}
