/*!
 * Assistant attachment estimates.
 *
 * Attaching a document to an assistant conversation costs input tokens.
 * The token count is approximated as one token per four characters of
 * text, rounded up, and priced against a small table of known models.
 */

use anyhow::Result;

use crate::database::models::{AttachmentRecord, DocumentRecord};

/// Model used when the attach command is given none
pub const DEFAULT_MODEL: &str = "claude-sonnet";

/// USD per million input tokens, per model
const MODEL_PRICES: [(&str, f64); 5] = [
    ("claude-haiku", 0.80),
    ("claude-sonnet", 3.00),
    ("claude-opus", 15.00),
    ("gpt-4o", 2.50),
    ("gpt-4o-mini", 0.15),
];

/// Approximate input tokens for a piece of text
///
/// One token per four characters, rounded up, which tracks typical
/// tokenizers closely enough for cost display.
pub fn estimate_tokens(text: &str) -> i64 {
    text.chars().count().div_ceil(4) as i64
}

/// Price in USD per million input tokens, if the model is known
pub fn price_per_million_tokens(model: &str) -> Option<f64> {
    MODEL_PRICES
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, price)| *price)
}

/// Models with a known price
pub fn known_models() -> Vec<&'static str> {
    MODEL_PRICES.iter().map(|(name, _)| *name).collect()
}

/// Build an attachment record with estimates for the given model
pub fn build_attachment(document: &DocumentRecord, model: &str) -> Result<AttachmentRecord> {
    let price = price_per_million_tokens(model).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown model: {} (known models: {})",
            model,
            known_models().join(", ")
        )
    })?;

    let tokens = estimate_tokens(&document.content);
    let cost = tokens as f64 * price / 1_000_000.0;

    Ok(AttachmentRecord::new(
        document.id.clone(),
        model.to_string(),
        tokens,
        cost,
    ))
}
