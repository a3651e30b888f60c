use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One retrieved candidate. `base_similarity` is `1 - cosine distance`; `boost` is the
/// summed lexical boost (0 when no lexical matching ran); `priority` is the rank tier
/// (1 title match, 2 content match, 3 vector only).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub metadata: Value,
	pub base_similarity: f32,
	pub boost: f32,
	pub priority: i32,
	pub distance: f64,
}
impl CandidateRow {
	/// Lexically boosted similarity, capped at 1.0. A negative base stays negative
	/// here; the result mapper clamps the final score into [0,1].
	pub fn combined_similarity(&self) -> f32 {
		(self.base_similarity + self.boost).min(1.0)
	}
}

#[derive(Debug)]
pub struct NewDocument {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub metadata: Value,
	pub embedding: Option<Vec<f32>>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use uuid::Uuid;

	use super::CandidateRow;

	fn row(base_similarity: f32, boost: f32) -> CandidateRow {
		CandidateRow {
			id: Uuid::new_v4(),
			title: "t".to_string(),
			content: "c".to_string(),
			metadata: json!({}),
			base_similarity,
			boost,
			priority: 1,
			distance: 0.0,
		}
	}

	#[test]
	fn combined_similarity_adds_the_boost() {
		assert!((row(0.4, 0.3).combined_similarity() - 0.7).abs() < 1e-6);
	}

	#[test]
	fn combined_similarity_is_capped_at_one() {
		assert_eq!(row(0.8, 0.9).combined_similarity(), 1.0);
	}
}
