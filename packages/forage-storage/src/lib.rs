pub mod db;
pub mod docs;
pub mod models;
pub mod retrieval;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
