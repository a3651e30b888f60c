use std::collections::HashSet;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Extract ID-shaped tokens (ticket numbers, model codes, serials) from query text.
///
/// Matches are collected per pattern class, then deduplicated case-insensitively
/// with an upper-cased canonical form.
pub fn extract_identifiers(text: &str) -> Vec<String> {
	let patterns = [
		// number-separator-number, e.g. "2024-001" or "12.4.7"
		r"\b\d+[-/._]\d+(?:[-/._]\d+)*\b",
		// letters then digits, e.g. "ABC123" or "INV-42"
		r"\b[A-Za-z]+[-/._]?\d+\b",
		// digits then letters, e.g. "30B" or "7-zip"
		r"\b\d+[-/._]?[A-Za-z]+\b",
	];
	let normalized: String = text.nfkc().collect();
	let mut seen = HashSet::new();
	let mut identifiers = Vec::new();

	for pattern in patterns {
		let Ok(re) = Regex::new(pattern) else {
			continue;
		};

		for matched in re.find_iter(&normalized) {
			let canonical = matched.as_str().trim().to_uppercase();

			if canonical.is_empty() {
				continue;
			}
			if seen.insert(canonical.clone()) {
				identifiers.push(canonical);
			}
		}
	}

	identifiers
}

/// Extract keyword tokens from query text, ordered by first occurrence.
///
/// Tokens are stripped of non-word characters and lower-cased. When the original
/// casing differs and the token is long enough, the original form is kept as well
/// so case-sensitive name matching stays possible downstream.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
	let normalized: String = text.nfkc().collect();
	let mut seen = HashSet::new();
	let mut keywords = Vec::new();

	for token in normalized.split_whitespace() {
		let stripped: String =
			token.chars().filter(|ch| ch.is_alphanumeric() || *ch == '_').collect();

		if stripped.chars().count() < 2 {
			continue;
		}
		if !stripped.chars().any(char::is_alphabetic) {
			continue;
		}

		let lowered = stripped.to_lowercase();

		if seen.insert(lowered.clone()) {
			keywords.push(lowered.clone());
		}
		if stripped != lowered && stripped.chars().count() >= 3 && seen.insert(stripped.clone()) {
			keywords.push(stripped);
		}
	}

	keywords.truncate(max_keywords);

	keywords
}
