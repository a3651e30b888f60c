mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cascade, Config, Documents, EmbeddingProviderConfig, Postgres, Providers, Scoring, Search,
	Storage, TranslationProviderConfig,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.documents.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.documents.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.documents.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.documents.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("api_base", &cfg.providers.embedding.api_base),
		("api_key", &cfg.providers.embedding.api_key),
		("path", &cfg.providers.embedding.path),
		("model", &cfg.providers.embedding.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.embedding.{label} must be non-empty."),
			});
		}
	}

	if let Some(translation) = cfg.providers.translation.as_ref() {
		for (label, value) in [
			("api_base", &translation.api_base),
			("api_key", &translation.api_key),
			("path", &translation.path),
			("model", &translation.model),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("providers.translation.{label} must be non-empty."),
				});
			}
		}

		if translation.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.translation.timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	if cfg.search.default_limit == 0 {
		return Err(Error::Validation {
			message: "search.default_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.search.default_threshold.is_finite() {
		return Err(Error::Validation {
			message: "search.default_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.search.default_threshold) {
		return Err(Error::Validation {
			message: "search.default_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.search.max_keywords == 0 {
		return Err(Error::Validation {
			message: "search.max_keywords must be greater than zero.".to_string(),
		});
	}
	if cfg.search.hybrid_keyword_terms == 0 {
		return Err(Error::Validation {
			message: "search.hybrid_keyword_terms must be greater than zero.".to_string(),
		});
	}
	if cfg.search.lexical_terms == 0 {
		return Err(Error::Validation {
			message: "search.lexical_terms must be greater than zero.".to_string(),
		});
	}
	if !(2..=3).contains(&cfg.search.corpus_language.len())
		|| !cfg.search.corpus_language.chars().all(|c| c.is_ascii_lowercase())
	{
		return Err(Error::Validation {
			message: "search.corpus_language must be a 2- or 3-letter language code.".to_string(),
		});
	}

	for (label, weight) in [
		("title_boost", cfg.scoring.title_boost),
		("content_boost", cfg.scoring.content_boost),
		("relaxed_gate_margin", cfg.scoring.relaxed_gate_margin),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("scoring.{label} must be a finite number."),
			});
		}
		if weight < 0.0 {
			return Err(Error::Validation {
				message: format!("scoring.{label} must be zero or greater."),
			});
		}
	}

	if !cfg.scoring.lexical_fallback_similarity.is_finite()
		|| !(0.0..=1.0).contains(&cfg.scoring.lexical_fallback_similarity)
	{
		return Err(Error::Validation {
			message: "scoring.lexical_fallback_similarity must be in the range 0.0-1.0.".to_string(),
		});
	}

	if cfg.cascade.relax_factors.is_empty() && cfg.cascade.floor_thresholds.is_empty() {
		return Err(Error::Validation {
			message: "cascade.relax_factors and cascade.floor_thresholds cannot both be empty."
				.to_string(),
		});
	}

	for factor in &cfg.cascade.relax_factors {
		if !factor.is_finite() || *factor <= 0.0 || *factor >= 1.0 {
			return Err(Error::Validation {
				message: "cascade.relax_factors entries must be greater than zero and less than one."
					.to_string(),
			});
		}
	}

	for floor in &cfg.cascade.floor_thresholds {
		if !floor.is_finite() || !(0.0..=1.0).contains(floor) {
			return Err(Error::Validation {
				message: "cascade.floor_thresholds entries must be in the range 0.0-1.0.".to_string(),
			});
		}
	}

	if cfg.cascade.floor_thresholds.windows(2).any(|pair| pair[0] < pair[1]) {
		return Err(Error::Validation {
			message: "cascade.floor_thresholds must be non-increasing.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.corpus_language = cfg.search.corpus_language.trim().to_ascii_lowercase();
}
