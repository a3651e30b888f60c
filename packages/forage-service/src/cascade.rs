use tracing::{debug, error, warn};

use crate::{ForageService, ServiceError, ServiceResult, TranslationProvider};
use forage_config::{Cascade, TranslationProviderConfig};
use forage_domain::language;
use forage_storage::{
	models::CandidateRow,
	retrieval::{HybridArgs, KeywordArgs, VectorArgs},
};

// Post-filter bands for hybrid candidates. A strong lexical boost stands on
// its own, a moderate one must still clear most of the threshold, and an
// unboosted row gets no slack at all.
const STRONG_BOOST_MIN: f32 = 0.3;
const STRONG_COMBINED_MIN: f32 = 0.5;
const STRONG_BASE_MIN: f32 = 0.2;
const MODERATE_BOOST_MIN: f32 = 0.15;
const MODERATE_SLACK: f32 = 0.2;
const MODERATE_FLOOR: f32 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Strategy {
	Hybrid,
	KeywordPriority,
	PureVector,
	ThresholdCascade,
	CrossLanguageRetry,
}
impl Strategy {
	pub(crate) fn as_str(self) -> &'static str {
		match self {
			Self::Hybrid => "hybrid",
			Self::KeywordPriority => "keyword_priority",
			Self::PureVector => "pure_vector",
			Self::ThresholdCascade => "threshold_cascade",
			Self::CrossLanguageRetry => "cross_language_retry",
		}
	}
}

pub(crate) struct CascadeArgs<'a> {
	pub(crate) query: &'a str,
	pub(crate) embedding: &'a [f32],
	pub(crate) terms: &'a [String],
	pub(crate) lexical_terms: &'a [String],
	pub(crate) threshold: f32,
	pub(crate) limit: u32,
}

pub(crate) struct CascadeOutcome {
	pub(crate) rows: Vec<CandidateRow>,
	pub(crate) strategy: Option<Strategy>,
}

/// Walk the strategy plan in order and stop at the first strategy that yields
/// rows. Running out of strategies is a successful empty result, not an error.
pub(crate) async fn run(
	svc: &ForageService,
	args: CascadeArgs<'_>,
) -> ServiceResult<CascadeOutcome> {
	let CascadeArgs { query, embedding, terms, lexical_terms, threshold, limit } = args;
	let cfg = &svc.cfg;
	let limit_rows = i64::from(limit);
	let mut hybrid_found_raw = false;

	for strategy in plan(!terms.is_empty(), translation(svc).is_some()) {
		let rows: Vec<CandidateRow> = match strategy {
			Strategy::Hybrid => {
				let raw = svc
					.store
					.hybrid(HybridArgs {
						embedding,
						terms,
						base_floor: threshold - cfg.scoring.relaxed_gate_margin,
						title_weight: cfg.scoring.title_boost,
						content_weight: cfg.scoring.content_boost,
						limit: limit_rows,
					})
					.await
					.map_err(|err| store_error(query, limit, threshold, err))?;

				// The lexical fallback keys off the unfiltered row count, so a
				// hybrid pass that found rows but filtered them all away still
				// suppresses it.
				hybrid_found_raw = !raw.is_empty();

				raw.into_iter().filter(|row| passes_post_filter(row, threshold)).collect()
			},
			Strategy::KeywordPriority => {
				if hybrid_found_raw {
					debug!("Hybrid saw raw rows; skipping the lexical fallback.");

					continue;
				}

				svc.store
					.keyword(KeywordArgs {
						terms: lexical_terms,
						placeholder_similarity: cfg.scoring.lexical_fallback_similarity,
						limit: limit_rows,
					})
					.await
					.map_err(|err| store_error(query, limit, threshold, err))?
			},
			Strategy::PureVector => svc
				.store
				.vector(VectorArgs { embedding, threshold, limit: limit_rows })
				.await
				.map_err(|err| store_error(query, limit, threshold, err))?,
			Strategy::ThresholdCascade => {
				let mut found = Vec::new();

				for relaxed in relaxation_ladder(threshold, &cfg.cascade) {
					let rows = svc
						.store
						.vector(VectorArgs { embedding, threshold: relaxed, limit: limit_rows })
						.await
						.map_err(|err| store_error(query, limit, threshold, err))?;

					if !rows.is_empty() {
						debug!(relaxed, "Relaxed threshold produced rows.");

						found = rows;

						break;
					}
				}

				found
			},
			Strategy::CrossLanguageRetry => {
				// Terminal whatever it returns; its failures never abort the
				// search.
				let rows = cross_language_retry(svc, query, limit_rows).await;
				let strategy = (!rows.is_empty()).then_some(Strategy::CrossLanguageRetry);

				return Ok(CascadeOutcome { rows, strategy });
			},
		};

		if !rows.is_empty() {
			debug!(strategy = strategy.as_str(), rows = rows.len(), "Strategy satisfied the query.");

			return Ok(CascadeOutcome { rows, strategy: Some(strategy) });
		}

		debug!(strategy = strategy.as_str(), "Strategy produced nothing; advancing.");
	}

	Ok(CascadeOutcome { rows: Vec::new(), strategy: None })
}

fn plan(has_terms: bool, has_translator: bool) -> Vec<Strategy> {
	let mut plan = vec![Strategy::Hybrid];

	if has_terms {
		plan.push(Strategy::KeywordPriority);
	}

	plan.push(Strategy::PureVector);
	plan.push(Strategy::ThresholdCascade);

	if has_translator {
		plan.push(Strategy::CrossLanguageRetry);
	}

	plan
}

fn passes_post_filter(row: &CandidateRow, threshold: f32) -> bool {
	let combined = row.combined_similarity();

	if row.boost > STRONG_BOOST_MIN {
		combined >= STRONG_COMBINED_MIN || row.base_similarity >= STRONG_BASE_MIN
	} else if row.boost > MODERATE_BOOST_MIN {
		combined >= (threshold - MODERATE_SLACK).max(MODERATE_FLOOR)
	} else {
		combined >= threshold
	}
}

/// Relaxed thresholds tried in order: the configured factors applied to the
/// requested threshold, then the fixed floors.
fn relaxation_ladder(threshold: f32, cfg: &Cascade) -> Vec<f32> {
	let mut ladder: Vec<f32> =
		cfg.relax_factors.iter().map(|factor| factor * threshold).collect();

	ladder.extend_from_slice(&cfg.floor_thresholds);

	ladder
}

fn translation(
	svc: &ForageService,
) -> Option<(&TranslationProviderConfig, &dyn TranslationProvider)> {
	let cfg = svc.cfg.providers.translation.as_ref()?;
	let provider = svc.providers.translation.as_deref()?;

	Some((cfg, provider))
}

async fn cross_language_retry(svc: &ForageService, query: &str, limit: i64) -> Vec<CandidateRow> {
	let Some((provider_cfg, provider)) = translation(svc) else {
		return Vec::new();
	};
	let corpus_language = svc.cfg.search.corpus_language.as_str();

	if language::is_confidently_in_language(query, corpus_language) {
		debug!(corpus_language, "Query already matches the corpus language; not translating.");

		return Vec::new();
	}

	let translated = match provider.translate(provider_cfg, query, corpus_language).await {
		Ok(text) => text,
		Err(err) => {
			warn!(error = %err, "Cross-language translation failed.");

			return Vec::new();
		},
	};
	let embedding =
		match svc.providers.embedding.embed(&svc.cfg.providers.embedding, &translated).await {
			Ok(embedding) => embedding,
			Err(err) => {
				warn!(error = %err, "Failed to embed the translated query.");

				return Vec::new();
			},
		};

	if embedding.len() != svc.cfg.providers.embedding.dimensions as usize {
		warn!(
			got = embedding.len(),
			expected = svc.cfg.providers.embedding.dimensions,
			"Translated query embedding has the wrong dimension."
		);

		return Vec::new();
	}

	match svc.store.vector(VectorArgs { embedding: &embedding, threshold: 0.0, limit }).await {
		Ok(rows) => rows,
		Err(err) => {
			warn!(error = %err, "Cross-language vector search failed.");

			Vec::new()
		},
	}
}

fn store_error(query: &str, limit: u32, threshold: f32, err: forage_storage::Error) -> ServiceError {
	error!(error = %err, limit, threshold, "Store query failed during search.");

	ServiceError::Store { query: query.to_string(), message: err.to_string() }
}
