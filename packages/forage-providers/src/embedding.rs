use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, Result};

/// Longest input the provider is asked to embed. Longer text is cut on a
/// grapheme boundary before the request goes out; truncation is never an error.
pub const MAX_EMBED_CHARS: usize = 8_000;

pub async fn embed(cfg: &forage_config::EmbeddingProviderConfig, text: &str) -> Result<Vec<f32>> {
	let submitted = truncate_for_provider(text);
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": submitted,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let vector = parse_embedding_response(json)?;

	if vector.is_empty() {
		return Err(Error::EmptyEmbedding {
			fragment: submitted.chars().take(160).collect(),
			length: submitted.chars().count(),
		});
	}

	Ok(vector)
}

pub fn truncate_for_provider(text: &str) -> &str {
	match text.grapheme_indices(true).nth(MAX_EMBED_CHARS) {
		Some((offset, _)) => &text[..offset],
		None => text,
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<f32>> {
	// Recognized shapes, most specific first: an OpenAI-style data array, a bare
	// object with an embedding field, or a bare array of numbers.
	if let Some(embedding) = json
		.get("data")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|item| item.get("embedding"))
	{
		return parse_vector(embedding);
	}
	if let Some(embedding) = json.get("embedding") {
		return parse_vector(embedding);
	}
	if json.is_array() {
		return parse_vector(&json);
	}

	Err(Error::InvalidResponse {
		message: "Embedding response shape is not recognized.".to_string(),
	})
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
	let values = value.as_array().ok_or_else(|| Error::InvalidResponse {
		message: "Embedding must be an array of numbers.".to_string(),
	})?;
	let mut vector = Vec::with_capacity(values.len());

	for value in values {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		vector.push(number as f32);
	}

	Ok(vector)
}
