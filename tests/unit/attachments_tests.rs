/*!
 * Tests for attachment token and cost estimation
 */

use lectern::attachments::{
    build_attachment, estimate_tokens, known_models, price_per_million_tokens, DEFAULT_MODEL,
};
use lectern::database::models::DocumentRecord;
use lectern::file_utils::DocumentKind;

fn sample_document(content: &str) -> DocumentRecord {
    DocumentRecord::new(
        "doc-1".to_string(),
        "notes.txt".to_string(),
        DocumentKind::Txt,
        content.to_string(),
        "hash".to_string(),
        "en".to_string(),
        content.len() as i64,
    )
}

/// Test the four-characters-per-token approximation with rounding up
#[test]
fn test_estimate_tokens_withVariousLengths_shouldRoundUp() {
    assert_eq!(estimate_tokens(""), 0);
    assert_eq!(estimate_tokens("a"), 1);
    assert_eq!(estimate_tokens("abcd"), 1);
    assert_eq!(estimate_tokens("abcde"), 2);
    assert_eq!(estimate_tokens(&"x".repeat(4000)), 1000);
    assert_eq!(estimate_tokens(&"x".repeat(4001)), 1001);
}

/// Test that tokens are counted over characters, not bytes
#[test]
fn test_estimate_tokens_withMultibyteText_shouldCountCharacters() {
    // Four umlauts are 8 bytes but a single estimated token
    assert_eq!(estimate_tokens("üüüü"), 1);
}

/// Test prices for every known model
#[test]
fn test_price_per_million_tokens_withKnownModels_shouldReturnPrice() {
    assert_eq!(price_per_million_tokens("claude-haiku"), Some(0.80));
    assert_eq!(price_per_million_tokens("claude-sonnet"), Some(3.00));
    assert_eq!(price_per_million_tokens("claude-opus"), Some(15.00));
    assert_eq!(price_per_million_tokens("gpt-4o"), Some(2.50));
    assert_eq!(price_per_million_tokens("gpt-4o-mini"), Some(0.15));

    assert_eq!(price_per_million_tokens("gpt-3"), None);
    assert_eq!(price_per_million_tokens(""), None);
}

/// Test that the default model is priced and the model list is complete
#[test]
fn test_known_models_shouldIncludeDefaultModel() {
    let models = known_models();

    assert_eq!(models.len(), 5);
    assert!(models.contains(&DEFAULT_MODEL));
    assert!(price_per_million_tokens(DEFAULT_MODEL).is_some());
}

/// Test attachment building with exact cost arithmetic
#[test]
fn test_build_attachment_withKnownModel_shouldComputeEstimates() {
    // 4000 characters estimate to exactly 1000 tokens
    let document = sample_document(&"x".repeat(4000));

    let attachment = build_attachment(&document, "claude-sonnet").unwrap();

    assert_eq!(attachment.document_id, "doc-1");
    assert_eq!(attachment.model, "claude-sonnet");
    assert_eq!(attachment.token_estimate, 1000);
    // 1000 tokens at $3.00 per million
    assert!((attachment.cost_estimate - 0.003).abs() < 1e-12);
}

/// Test that an unknown model is rejected with the list of valid choices
#[test]
fn test_build_attachment_withUnknownModel_shouldReturnError() {
    let document = sample_document("Some document content");

    let result = build_attachment(&document, "gpt-2");

    let message = result.unwrap_err().to_string();
    assert!(message.contains("Unknown model: gpt-2"));
    assert!(message.contains("claude-sonnet"));
}
