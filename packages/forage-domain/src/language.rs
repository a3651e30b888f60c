use unicode_normalization::UnicodeNormalization;

/// True when language identification confidently reports that `text` is written
/// in `language` (an ISO 639-1 or 639-3 code). Short input, an unknown code, or
/// an unreliable detection all return false, so callers treat false as
/// "cannot rule out a foreign-language query".
pub fn is_confidently_in_language(text: &str, language: &str) -> bool {
	let Some(expected) = expected_lang(language) else {
		return false;
	};
	let normalized: String = text.nfkc().collect();

	if !enough_signal(&normalized) {
		return false;
	}

	let Some(info) = whatlang::detect(&normalized) else {
		return false;
	};

	// Be conservative: only trust the detector when it is confident.
	if !info.is_reliable() {
		return false;
	}
	if info.confidence() < 0.85 {
		return false;
	}

	info.lang() == expected
}

fn expected_lang(code: &str) -> Option<whatlang::Lang> {
	// Common two-letter codes folded onto the three-letter codes the detector
	// reports. Three-letter codes pass through unchanged.
	let code = match code {
		"de" => "deu",
		"en" => "eng",
		"es" => "spa",
		"fr" => "fra",
		"it" => "ita",
		"ja" => "jpn",
		"ko" => "kor",
		"nl" => "nld",
		"pl" => "pol",
		"pt" => "por",
		"ru" => "rus",
		"sv" => "swe",
		"tr" => "tur",
		"uk" => "ukr",
		"zh" => "cmn",
		_ => code,
	};

	whatlang::Lang::from_code(code)
}

fn enough_signal(text: &str) -> bool {
	let mut letters = 0_usize;
	let mut whitespace = 0_usize;

	for ch in text.chars() {
		if ch.is_whitespace() {
			whitespace += 1;
		} else if ch.is_alphabetic() {
			letters += 1;
		}
	}

	// Below this the detector is noise even when it claims confidence.
	letters >= 12 && whitespace >= 1
}

#[cfg(test)]
mod tests {
	use super::is_confidently_in_language;

	#[test]
	fn long_english_text_matches_english() {
		let text = "Please summarize the changes that were introduced in the most recent \
			release, including the migration steps that operators need to follow.";

		assert!(is_confidently_in_language(text, "en"));
		assert!(is_confidently_in_language(text, "eng"));
	}

	#[test]
	fn short_text_is_inconclusive() {
		assert!(!is_confidently_in_language("Hello", "en"));
		assert!(!is_confidently_in_language("2024-001", "en"));
	}

	#[test]
	fn foreign_text_does_not_match() {
		let text = "Der Bericht für das vierte Quartal enthält ausführliche Zahlen zu Umsatz, \
			Gewinn und Mitarbeiterentwicklung in allen Regionen des Unternehmens.";

		assert!(!is_confidently_in_language(text, "en"));
	}

	#[test]
	fn unknown_language_code_is_inconclusive() {
		let text = "Please summarize the changes that were introduced in the most recent \
			release, including the migration steps that operators need to follow.";

		assert!(!is_confidently_in_language(text, "xx"));
	}
}
