use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for detection and ISO language code handling
///
/// This module provides the document language detector plus functions
/// for validating, normalizing, and matching ISO 639-1 (2-letter) and
/// ISO 639-2 (3-letter) language codes.
/// Number of leading characters the detector samples
const DETECTION_SAMPLE_CHARS: usize = 1000;

/// Common-word tables for the supported detection languages.
/// Detection picks the language with the most whitespace-delimited
/// keyword hits in the sample; ties fall through to English.
const LANGUAGE_KEYWORDS: [(&str, &[&str]); 4] = [
    ("en", &["the", "and", "is", "in", "to", "of", "that", "it", "was", "for"]),
    ("es", &["el", "la", "de", "que", "los", "una", "es", "por", "con", "para"]),
    ("fr", &["le", "les", "des", "est", "dans", "une", "que", "pour", "sur", "avec"]),
    ("de", &["der", "die", "das", "und", "ist", "nicht", "von", "mit", "den", "auf"]),
];

/// Detect the language of a document from its leading text.
///
/// Counts keyword hits over the first 1000 characters across four
/// hardcoded languages and returns the ISO 639-1 code of the best
/// match. A weak heuristic, kept deliberately: documents short on
/// common words (or in any other language) come back as English.
pub fn detect_language(text: &str) -> String {
    let sample: String = text.chars().take(DETECTION_SAMPLE_CHARS).collect();

    let tokens: Vec<String> = sample
        .split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect();

    let mut best_code = "en";
    let mut best_hits = 0usize;

    for (code, keywords) in LANGUAGE_KEYWORDS {
        let hits = tokens
            .iter()
            .filter(|token| keywords.contains(&token.as_str()))
            .count();
        if hits > best_hits {
            best_hits = hits;
            best_code = code;
        }
    }

    best_code.to_string()
}

/// ISO 639-2/B codes that differ from their 639-2/T equivalents
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra", // French
        "ger" => "deu", // German
        "dut" => "nld", // Dutch
        "gre" => "ell", // Greek
        "chi" => "zho", // Chinese
        "cze" => "ces", // Czech
        "ice" => "isl", // Icelandic
        "alb" => "sqi", // Albanian
        "arm" => "hye", // Armenian
        "baq" => "eus", // Basque
        "bur" => "mya", // Burmese
        "per" => "fas", // Persian
        "geo" => "kat", // Georgian
        "may" => "msa", // Malay
        "mac" => "mkd", // Macedonian
        "rum" => "ron", // Romanian
        "slo" => "slk", // Slovak
        "wel" => "cym", // Welsh
        _ => return None,
    };
    Some(part2t)
}

/// Validate that a language code is a recognized ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<()> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(());
        }
    } else if normalized_code.len() == 3
        && (Language::from_639_3(&normalized_code).is_some()
            || part2b_to_part2t(&normalized_code).is_some())
    {
        return Ok(());
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible.
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists.
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    // Already a 2-letter code
    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
    } else if normalized_code.len() == 3 {
        // Map a bibliographic code to its terminological form first
        let part2t = part2b_to_part2t(&normalized_code).unwrap_or(&normalized_code);

        if let Some(lang) = Language::from_639_3(part2t) {
            if let Some(code_639_1) = lang.to_639_1() {
                return Ok(code_639_1.to_string());
            }
            // No 2-letter equivalent exists for this language
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let normalized1 = match normalize_to_part1_or_part2t(code1) {
        Ok(n) => n,
        Err(_) => return false,
    };

    let normalized2 = match normalize_to_part1_or_part2t(code2) {
        Ok(n) => n,
        Err(_) => return false,
    };

    normalized1 == normalized2
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part1_or_part2t(code)?;

    let lang = if normalized.len() == 2 {
        Language::from_639_1(&normalized)
    } else {
        Language::from_639_3(&normalized)
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
