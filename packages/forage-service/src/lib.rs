pub mod search;

mod cascade;

use std::{future::Future, pin::Pin, sync::Arc};

use forage_config::{Config, EmbeddingProviderConfig, TranslationProviderConfig};
use forage_providers::{embedding, translation};
use forage_storage::{
	db::Db,
	models::CandidateRow,
	retrieval::{self, HybridArgs, KeywordArgs, VectorArgs},
};
pub use search::{RankedDocument, RankedResult, SearchRequest};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, forage_providers::Result<Vec<f32>>>;
}

pub trait TranslationProvider
where
	Self: Send + Sync,
{
	fn translate<'a>(
		&'a self,
		cfg: &'a TranslationProviderConfig,
		text: &'a str,
		target_language: &'a str,
	) -> BoxFuture<'a, forage_providers::Result<String>>;
}

pub trait RetrievalStore
where
	Self: Send + Sync,
{
	fn hybrid<'a>(
		&'a self,
		args: HybridArgs<'a>,
	) -> BoxFuture<'a, forage_storage::Result<Vec<CandidateRow>>>;

	fn vector<'a>(
		&'a self,
		args: VectorArgs<'a>,
	) -> BoxFuture<'a, forage_storage::Result<Vec<CandidateRow>>>;

	fn keyword<'a>(
		&'a self,
		args: KeywordArgs<'a>,
	) -> BoxFuture<'a, forage_storage::Result<Vec<CandidateRow>>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	Embedding { query: String, message: String },
	Store { query: String, message: String },
}
impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Embedding { query, message } => {
				write!(f, "Embedding failed for query {query:?}: {message}")
			},
			Self::Store { query, message } => {
				write!(f, "Retrieval failed for query {query:?}: {message}")
			},
		}
	}
}
impl std::error::Error for ServiceError {}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub translation: Option<Arc<dyn TranslationProvider>>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		translation: Option<Arc<dyn TranslationProvider>>,
	) -> Self {
		Self { embedding, translation }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), translation: Some(provider) }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, forage_providers::Result<Vec<f32>>> {
		Box::pin(embedding::embed(cfg, text))
	}
}
impl TranslationProvider for DefaultProviders {
	fn translate<'a>(
		&'a self,
		cfg: &'a TranslationProviderConfig,
		text: &'a str,
		target_language: &'a str,
	) -> BoxFuture<'a, forage_providers::Result<String>> {
		Box::pin(translation::translate(cfg, text, target_language))
	}
}

pub struct PgStore {
	pub db: Db,
}
impl RetrievalStore for PgStore {
	fn hybrid<'a>(
		&'a self,
		args: HybridArgs<'a>,
	) -> BoxFuture<'a, forage_storage::Result<Vec<CandidateRow>>> {
		Box::pin(retrieval::hybrid(&self.db.pool, args))
	}

	fn vector<'a>(
		&'a self,
		args: VectorArgs<'a>,
	) -> BoxFuture<'a, forage_storage::Result<Vec<CandidateRow>>> {
		Box::pin(retrieval::vector(&self.db.pool, args))
	}

	fn keyword<'a>(
		&'a self,
		args: KeywordArgs<'a>,
	) -> BoxFuture<'a, forage_storage::Result<Vec<CandidateRow>>> {
		Box::pin(retrieval::keyword(&self.db.pool, args))
	}
}

pub struct ForageService {
	pub cfg: Config,
	pub store: Arc<dyn RetrievalStore>,
	pub providers: Providers,
}
impl ForageService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, store: Arc::new(PgStore { db }), providers }
	}

	pub fn with_store(cfg: Config, store: Arc<dyn RetrievalStore>, providers: Providers) -> Self {
		Self { cfg, store, providers }
	}
}
