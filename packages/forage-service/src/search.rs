use std::{cmp::Ordering, collections::HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
	ForageService, ServiceError, ServiceResult,
	cascade::{self, CascadeArgs},
};
use forage_domain::analyzer;
use forage_storage::models::CandidateRow;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub limit: Option<u32>,
	pub threshold: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedDocument {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub metadata: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedResult {
	pub document: RankedDocument,
	pub similarity: f32,
}

impl ForageService {
	/// Answer a retrieval query by walking the strategy cascade until one
	/// strategy produces rows. An empty result is a valid answer; only provider
	/// and store failures surface as errors.
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<Vec<RankedResult>> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query is required.".to_string(),
			});
		}
		if let Some(limit) = req.limit
			&& limit == 0
		{
			return Err(ServiceError::InvalidRequest {
				message: "limit must be at least 1.".to_string(),
			});
		}
		if let Some(threshold) = req.threshold
			&& (!threshold.is_finite() || !(0.0..=1.0).contains(&threshold))
		{
			return Err(ServiceError::InvalidRequest {
				message: "threshold must be a finite value between 0 and 1.".to_string(),
			});
		}

		let cfg = &self.cfg;
		let limit = req.limit.unwrap_or(cfg.search.default_limit);
		let threshold = req.threshold.unwrap_or(cfg.search.default_threshold);
		let identifiers = analyzer::extract_identifiers(query);
		let keywords = analyzer::extract_keywords(query, cfg.search.max_keywords as usize);
		let terms = merge_terms(&identifiers, &keywords, cfg.search.hybrid_keyword_terms as usize);
		let mut lexical_terms = terms.clone();

		lexical_terms.truncate(cfg.search.lexical_terms as usize);

		let embedding = self
			.providers
			.embedding
			.embed(&cfg.providers.embedding, query)
			.await
			.map_err(|err| {
				error!(error = %err, limit, threshold, "Embedding failed during search.");

				ServiceError::Embedding { query: query.to_string(), message: err.to_string() }
			})?;

		if embedding.len() != cfg.providers.embedding.dimensions as usize {
			error!(
				got = embedding.len(),
				expected = cfg.providers.embedding.dimensions,
				limit,
				threshold,
				"Embedding dimension mismatch."
			);

			return Err(ServiceError::Embedding {
				query: query.to_string(),
				message: format!(
					"Provider returned {} dimensions, the store expects {}.",
					embedding.len(),
					cfg.providers.embedding.dimensions
				),
			});
		}

		let outcome = cascade::run(self, CascadeArgs {
			query,
			embedding: &embedding,
			terms: &terms,
			lexical_terms: &lexical_terms,
			threshold,
			limit,
		})
		.await?;
		let results = rank_rows(outcome.rows, limit as usize);

		info!(
			strategy = outcome.strategy.map_or("none", |strategy| strategy.as_str()),
			results = results.len(),
			limit,
			threshold,
			"Search completed."
		);

		Ok(results)
	}
}

/// Merge identifiers and capped keywords into the lexical term list, keeping
/// identifiers first. ILIKE matching is case-insensitive, so case variants of
/// the same term are folded to avoid counting one match twice.
fn merge_terms(identifiers: &[String], keywords: &[String], keyword_cap: usize) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut terms = Vec::new();

	for term in identifiers.iter().chain(keywords.iter().take(keyword_cap)) {
		if seen.insert(term.to_lowercase()) {
			terms.push(term.clone());
		}
	}

	terms
}

fn rank_rows(rows: Vec<CandidateRow>, limit: usize) -> Vec<RankedResult> {
	let mut seen = HashSet::new();
	let mut deduped: Vec<CandidateRow> = Vec::with_capacity(rows.len());

	for row in rows {
		if seen.insert(row.id) {
			deduped.push(row);
		}
	}

	// sort_by is stable, so rows that tie on every key keep the order the
	// strategy returned them in (the keyword strategy orders ties by recency).
	deduped.sort_by(|a, b| {
		a.priority
			.cmp(&b.priority)
			.then_with(|| {
				b.combined_similarity()
					.partial_cmp(&a.combined_similarity())
					.unwrap_or(Ordering::Equal)
			})
			.then_with(|| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
	});
	deduped.truncate(limit);

	deduped
		.into_iter()
		.map(|row| {
			let similarity = row.combined_similarity().clamp(0.0, 1.0);

			RankedResult {
				document: RankedDocument {
					id: row.id,
					title: row.title,
					content: row.content,
					metadata: row.metadata,
				},
				similarity,
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use uuid::Uuid;

	use super::{merge_terms, rank_rows};
	use forage_storage::models::CandidateRow;

	fn term_list(raw: &[&str]) -> Vec<String> {
		raw.iter().map(|term| term.to_string()).collect()
	}

	fn row(base_similarity: f32, boost: f32, priority: i32, distance: f64) -> CandidateRow {
		CandidateRow {
			id: Uuid::new_v4(),
			title: "title".to_string(),
			content: "content".to_string(),
			metadata: json!({}),
			base_similarity,
			boost,
			priority,
			distance,
		}
	}

	#[test]
	fn merge_puts_identifiers_first_and_caps_keywords() {
		let identifiers = term_list(&["INV-42"]);
		let keywords = term_list(&["alpha", "beta", "gamma"]);

		assert_eq!(merge_terms(&identifiers, &keywords, 2), term_list(&["INV-42", "alpha", "beta"]));
	}

	#[test]
	fn merge_folds_case_variants() {
		let identifiers = term_list(&["ABC-123"]);
		let keywords = term_list(&["julio", "Julio", "abc-123"]);

		assert_eq!(merge_terms(&identifiers, &keywords, 10), term_list(&["ABC-123", "julio"]));
	}

	#[test]
	fn merge_applies_the_cap_before_deduplication() {
		let keywords = term_list(&["alpha", "Alpha", "beta"]);

		// The cap admits two entries and the case fold then collapses them.
		assert_eq!(merge_terms(&[], &keywords, 2), term_list(&["alpha"]));
	}

	#[test]
	fn rank_orders_by_priority_before_similarity() {
		let vector_only = row(0.9, 0.0, 3, 0.1);
		let title_hit = row(0.1, 0.5, 1, 0.9);
		let content_hit = row(0.5, 0.3, 2, 0.5);
		let ranked =
			rank_rows(vec![vector_only.clone(), title_hit.clone(), content_hit.clone()], 10);

		assert_eq!(
			ranked.iter().map(|result| result.document.id).collect::<Vec<_>>(),
			vec![title_hit.id, content_hit.id, vector_only.id]
		);
	}

	#[test]
	fn rank_breaks_priority_ties_by_combined_similarity_then_distance() {
		let close = row(0.8, 0.0, 3, 0.2);
		let far = row(0.8, 0.0, 3, 0.4);
		let strong = row(0.9, 0.0, 3, 0.3);
		let ranked = rank_rows(vec![far.clone(), close.clone(), strong.clone()], 10);

		assert_eq!(
			ranked.iter().map(|result| result.document.id).collect::<Vec<_>>(),
			vec![strong.id, close.id, far.id]
		);
	}

	#[test]
	fn rank_drops_duplicate_ids_and_truncates_to_the_limit() {
		let first = row(0.9, 0.0, 3, 0.1);
		let second = row(0.8, 0.0, 3, 0.2);
		let third = row(0.7, 0.0, 3, 0.3);
		let ranked = rank_rows(vec![first.clone(), first.clone(), second.clone(), third], 2);

		assert_eq!(
			ranked.iter().map(|result| result.document.id).collect::<Vec<_>>(),
			vec![first.id, second.id]
		);
	}

	#[test]
	fn rank_caps_similarity_at_one_and_clamps_negatives_to_zero() {
		let boosted = row(0.8, 0.8, 1, 0.2);
		let negative = row(-0.4, 0.1, 3, 1.4);
		let ranked = rank_rows(vec![boosted, negative], 10);

		assert_eq!(ranked[0].similarity, 1.0);
		assert_eq!(ranked[1].similarity, 0.0);
	}

	#[test]
	fn rank_preserves_arrival_order_for_full_ties() {
		let first = row(0.5, 0.0, 2, 0.0);
		let second = row(0.5, 0.0, 2, 0.0);
		let ranked = rank_rows(vec![first.clone(), second.clone()], 10);

		assert_eq!(
			ranked.iter().map(|result| result.document.id).collect::<Vec<_>>(),
			vec![first.id, second.id]
		);
	}
}
