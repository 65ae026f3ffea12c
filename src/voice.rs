/*!
 * Voice metadata and selection.
 *
 * Voice resolution is a stateless lookup performed fresh whenever the
 * document language changes: a saved per-language preference wins,
 * then the first voice whose locale prefix matches the 2-letter
 * language code, then the backend default (no explicit voice).
 */

use serde::{Deserialize, Serialize};

use crate::language_utils;

/// A voice advertised by a speech backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Stable identifier understood by the backend
    pub id: String,
    /// Human-readable voice name
    pub label: String,
    /// Locale tag, e.g. "en-US" or "de"
    pub language: String,
    /// Quality tier advertised by the backend, when known
    pub quality: Option<String>,
}

impl VoiceInfo {
    /// Check whether this voice's locale prefix matches a language code
    pub fn matches_language(&self, language: &str) -> bool {
        let wanted = match language_utils::normalize_to_part1_or_part2t(language) {
            Ok(code) => code,
            Err(_) => language.trim().to_lowercase(),
        };

        let prefix = self
            .language
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_lowercase();

        prefix == wanted
    }
}

impl std::fmt::Display for VoiceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.quality {
            Some(quality) => write!(f, "{} [{}] ({}, {})", self.label, self.id, self.language, quality),
            None => write!(f, "{} [{}] ({})", self.label, self.id, self.language),
        }
    }
}

/// Resolve the voice to use for a document language.
///
/// Returns None when no preference matches and no voice covers the
/// language; the backend then speaks with its own default.
pub fn resolve_voice<'a>(
    voices: &'a [VoiceInfo],
    language: &str,
    preferred_id: Option<&str>,
) -> Option<&'a VoiceInfo> {
    if let Some(preferred) = preferred_id {
        if let Some(voice) = voices.iter().find(|v| v.id == preferred) {
            return Some(voice);
        }
    }

    voices.iter().find(|v| v.matches_language(language))
}
