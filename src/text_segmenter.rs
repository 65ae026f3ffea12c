/*!
 * Text segmentation for narration.
 *
 * Splits raw extracted document text into paragraphs and sentences.
 * Paragraph boundaries are blank lines (whitespace runs containing at
 * least two newlines); sentences are cut on runs of `.`, `!` or `?`
 * followed by whitespace. Segmentation is pure and deterministic, so
 * only raw text is persisted and paragraphs are re-derived on load.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Whitespace run containing at least two newlines, i.e. a blank line
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\n\s*\n\s*").unwrap());

/// A paragraph of document text, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// 1-based ordinal of this paragraph within the document
    pub number: usize,
    /// Full trimmed paragraph text
    pub text: String,
    /// Ordered sentences, each carrying its terminal punctuation
    pub sentences: Vec<String>,
    /// Count of whitespace-delimited tokens in the paragraph text
    pub word_count: usize,
}

impl Paragraph {
    /// Build a paragraph from already-trimmed text
    fn new(number: usize, text: &str) -> Self {
        Self {
            number,
            text: text.to_string(),
            sentences: split_sentences(text),
            word_count: count_words(text),
        }
    }

    /// Total number of sentences in this paragraph (always at least one)
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }
}

/// Split raw text into ordered paragraphs.
///
/// Empty or all-whitespace input yields an empty vector; callers are
/// expected to have rejected such input during validation. Any chunk
/// that is non-empty after trimming becomes a paragraph with at least
/// one sentence.
pub fn segment(text: &str) -> Vec<Paragraph> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(idx, chunk)| Paragraph::new(idx + 1, chunk))
        .collect()
}

/// Split a paragraph into sentences.
///
/// A sentence boundary is a run of one or more of `.`, `!`, `?`
/// followed by whitespace; the sentence keeps its punctuation run.
/// Punctuation not followed by whitespace (decimals, abbreviations
/// mid-token) does not cut. If the text contains no boundary at
/// all, the whole trimmed text is returned as the sole sentence, so
/// a non-empty paragraph never has zero sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut in_terminator = false;

    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            in_terminator = true;
        } else if in_terminator && ch.is_whitespace() {
            let sentence = text[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = idx;
            in_terminator = false;
        } else {
            in_terminator = false;
        }
    }

    // Tail after the last boundary; doubles as the whole-paragraph
    // fallback when no boundary was found
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Count whitespace-delimited tokens
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
