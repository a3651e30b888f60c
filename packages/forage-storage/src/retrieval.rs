use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{Error, Result, models::CandidateRow};

pub struct HybridArgs<'a> {
	pub embedding: &'a [f32],
	pub terms: &'a [String],
	/// Minimum base similarity for rows with no lexical match, already relaxed by the
	/// caller's gate margin.
	pub base_floor: f32,
	pub title_weight: f32,
	pub content_weight: f32,
	pub limit: i64,
}

pub struct VectorArgs<'a> {
	pub embedding: &'a [f32],
	pub threshold: f32,
	pub limit: i64,
}

pub struct KeywordArgs<'a> {
	pub terms: &'a [String],
	pub placeholder_similarity: f32,
	pub limit: i64,
}

/// One blended retrieval pass. Rows qualify when the base similarity clears the
/// relaxed floor or any term matches title or content. Ordered by priority tier,
/// then capped combined similarity, then raw distance.
pub async fn hybrid(pool: &PgPool, args: HybridArgs<'_>) -> Result<Vec<CandidateRow>> {
	let HybridArgs { embedding, terms, base_floor, title_weight, content_weight, limit } = args;
	let vector_text = vector_literal(embedding)?;
	let patterns =
		terms.iter().map(|term| format!("%{}%", escape_like(term))).collect::<Vec<_>>();
	let mut builder = QueryBuilder::new(
		"\
SELECT
\tid,
\ttitle,
\tcontent,
\tmetadata,
\tbase_similarity,
\t(title_hits * ",
	);

	builder.push_bind(title_weight);
	builder.push(" + content_hits * ");
	builder.push_bind(content_weight);
	builder.push(
		"\
)::real AS boost,
\tCASE WHEN title_hits > 0 THEN 1 WHEN content_hits > 0 THEN 2 ELSE 3 END AS priority,
\tdistance
FROM (
\tSELECT
\t\tid,
\t\ttitle,
\t\tcontent,
\t\tmetadata,
\t\t(1 - (embedding <=> ",
	);
	builder.push_bind(vector_text.clone());
	builder.push("::text::vector))::real AS base_similarity,\n\t\t(embedding <=> ");
	builder.push_bind(vector_text);
	builder.push("::text::vector) AS distance,\n\t\t");
	push_hit_count(&mut builder, "title", &patterns);
	builder.push(" AS title_hits,\n\t\t");
	push_hit_count(&mut builder, "content", &patterns);
	builder.push(" AS content_hits\n\tFROM documents\n\tWHERE embedding IS NOT NULL\n) scored\nWHERE base_similarity > ");
	builder.push_bind(base_floor);
	builder.push(" OR title_hits + content_hits > 0\nORDER BY priority, LEAST(1.0::real, base_similarity + (title_hits * ");
	builder.push_bind(title_weight);
	builder.push(" + content_hits * ");
	builder.push_bind(content_weight);
	builder.push(")::real) DESC, distance\nLIMIT ");
	builder.push_bind(limit);

	let rows = builder.build_query_as::<CandidateRow>().fetch_all(pool).await?;

	Ok(rows)
}

/// Pure vector pass: rows whose similarity strictly exceeds the threshold, nearest
/// first.
pub async fn vector(pool: &PgPool, args: VectorArgs<'_>) -> Result<Vec<CandidateRow>> {
	let VectorArgs { embedding, threshold, limit } = args;
	let vector_text = vector_literal(embedding)?;
	let rows = sqlx::query_as::<_, CandidateRow>(
		"\
SELECT
\tid,
\ttitle,
\tcontent,
\tmetadata,
\t(1 - (embedding <=> $1::text::vector))::real AS base_similarity,
\t0::real AS boost,
\t3 AS priority,
\t(embedding <=> $1::text::vector) AS distance
FROM documents
WHERE embedding IS NOT NULL
\tAND (1 - (embedding <=> $1::text::vector))::real > $2
ORDER BY embedding <=> $1::text::vector
LIMIT $3",
	)
	.bind(vector_text.as_str())
	.bind(threshold)
	.bind(limit)
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

/// Pure lexical pass. Every hit carries the placeholder similarity; title matches
/// rank ahead of content matches, newest documents first within a tier.
pub async fn keyword(pool: &PgPool, args: KeywordArgs<'_>) -> Result<Vec<CandidateRow>> {
	let KeywordArgs { terms, placeholder_similarity, limit } = args;

	if terms.is_empty() {
		return Ok(Vec::new());
	}

	let patterns =
		terms.iter().map(|term| format!("%{}%", escape_like(term))).collect::<Vec<_>>();
	let mut builder = QueryBuilder::new(
		"\
SELECT
\tid,
\ttitle,
\tcontent,
\tmetadata,
\t",
	);

	builder.push_bind(placeholder_similarity);
	builder.push("::real AS base_similarity,\n\t0::real AS boost,\n\tCASE WHEN ");
	push_ilike_any(&mut builder, "title", &patterns);
	builder.push(" THEN 1 ELSE 2 END AS priority,\n\t0::float8 AS distance\nFROM documents\nWHERE ");

	{
		let mut separated = builder.separated(" OR ");

		for pattern in &patterns {
			separated.push("(title ILIKE ");
			separated.push_bind_unseparated(pattern.clone());
			separated.push_unseparated(" OR content ILIKE ");
			separated.push_bind_unseparated(pattern.clone());
			separated.push_unseparated(")");
		}
	}

	builder.push("\nORDER BY priority, updated_at DESC\nLIMIT ");
	builder.push_bind(limit);

	let rows = builder.build_query_as::<CandidateRow>().fetch_all(pool).await?;

	Ok(rows)
}

/// Renders an embedding as the `[a,b,c]` literal pgvector parses from text.
pub fn vector_literal(embedding: &[f32]) -> Result<String> {
	if embedding.is_empty() {
		return Err(Error::InvalidArgument("Embedding must be non-empty.".to_string()));
	}

	let mut out = String::with_capacity(embedding.len() * 8);

	out.push('[');

	for (i, value) in embedding.iter().enumerate() {
		if !value.is_finite() {
			return Err(Error::InvalidArgument(format!(
				"Embedding component {i} is not finite."
			)));
		}
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	Ok(out)
}

fn push_hit_count(builder: &mut QueryBuilder<'_, Postgres>, column: &str, patterns: &[String]) {
	if patterns.is_empty() {
		builder.push("0");

		return;
	}

	builder.push("(");

	{
		let mut separated = builder.separated(" + ");

		for pattern in patterns {
			separated.push("CASE WHEN ");
			separated.push_unseparated(column);
			separated.push_unseparated(" ILIKE ");
			separated.push_bind_unseparated(pattern.clone());
			separated.push_unseparated(" THEN 1 ELSE 0 END");
		}
	}

	builder.push(")");
}

fn push_ilike_any(builder: &mut QueryBuilder<'_, Postgres>, column: &str, patterns: &[String]) {
	builder.push("(");

	{
		let mut separated = builder.separated(" OR ");

		for pattern in patterns {
			separated.push(column);
			separated.push_unseparated(" ILIKE ");
			separated.push_bind_unseparated(pattern.clone());
		}
	}

	builder.push(")");
}

fn escape_like(term: &str) -> String {
	let mut out = String::with_capacity(term.len());

	for ch in term.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

#[cfg(test)]
mod tests {
	use super::{escape_like, vector_literal};

	#[test]
	fn vector_literal_renders_brackets_and_commas() {
		let text = vector_literal(&[0.5, -1.0, 0.25]).expect("render failed");

		assert_eq!(text, "[0.5,-1,0.25]");
	}

	#[test]
	fn vector_literal_rejects_empty_embeddings() {
		let err = vector_literal(&[]).expect_err("empty embedding must fail");

		assert!(err.to_string().contains("non-empty"), "Unexpected error: {err}");
	}

	#[test]
	fn vector_literal_rejects_non_finite_components() {
		let err = vector_literal(&[0.1, f32::NAN]).expect_err("NaN must fail");

		assert!(err.to_string().contains("component 1"), "Unexpected error: {err}");
	}

	#[test]
	fn escape_like_escapes_wildcards() {
		assert_eq!(escape_like("100%_done\\now"), "100\\%\\_done\\\\now");
		assert_eq!(escape_like("plain"), "plain");
	}
}
