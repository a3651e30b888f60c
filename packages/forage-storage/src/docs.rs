use sqlx::PgExecutor;

use crate::{Result, models::NewDocument, retrieval::vector_literal};

pub async fn insert_document<'e, E>(executor: E, doc: &NewDocument) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let embedding_text = doc.embedding.as_deref().map(vector_literal).transpose()?;

	sqlx::query(
		"\
INSERT INTO documents (
\tid,
\ttitle,
\tcontent,
\tmetadata,
\tembedding,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5::text::vector,$6,$7)",
	)
	.bind(doc.id)
	.bind(doc.title.as_str())
	.bind(doc.content.as_str())
	.bind(&doc.metadata)
	.bind(embedding_text)
	.bind(doc.created_at)
	.bind(doc.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn count_documents<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents")
		.fetch_one(executor)
		.await?;

	Ok(count)
}
