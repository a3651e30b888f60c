pub mod analyzer;
pub mod language;
