use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub scoring: Scoring,
	#[serde(default)]
	pub cascade: Cascade,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub documents: Documents,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Documents {
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub translation: Option<TranslationProviderConfig>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct TranslationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub default_threshold: f32,
	pub max_keywords: u32,
	pub hybrid_keyword_terms: u32,
	pub lexical_terms: u32,
	/// ISO 639 code of the language the corpus is written in.
	pub corpus_language: String,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: 5,
			default_threshold: 0.3,
			max_keywords: 15,
			hybrid_keyword_terms: 10,
			lexical_terms: 5,
			corpus_language: "en".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scoring {
	pub title_boost: f32,
	pub content_boost: f32,
	pub relaxed_gate_margin: f32,
	pub lexical_fallback_similarity: f32,
}
impl Default for Scoring {
	fn default() -> Self {
		Self {
			title_boost: 0.5,
			content_boost: 0.3,
			relaxed_gate_margin: 0.5,
			lexical_fallback_similarity: 0.5,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cascade {
	pub relax_factors: Vec<f32>,
	pub floor_thresholds: Vec<f32>,
}
impl Default for Cascade {
	fn default() -> Self {
		Self { relax_factors: vec![0.7, 0.5], floor_thresholds: vec![0.1, 0.05, 0.01, 0.0] }
	}
}
