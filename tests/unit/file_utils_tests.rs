/*!
 * Tests for file utilities and document kind classification
 */

use std::fs;
use std::str::FromStr;
use anyhow::Result;
use lectern::file_utils::{DocumentKind, FileManager, DOCX_SIZE_LIMIT, OVERALL_SIZE_LIMIT, PDF_SIZE_LIMIT};
use crate::common;

/// Test classifying files by extension
#[test]
fn test_from_path_withSupportedExtensions_shouldClassifyKind() {
    assert_eq!(DocumentKind::from_path("book.pdf"), Some(DocumentKind::Pdf));
    assert_eq!(DocumentKind::from_path("report.docx"), Some(DocumentKind::Docx));
    assert_eq!(DocumentKind::from_path("notes.txt"), Some(DocumentKind::Txt));

    // Extension matching is case-insensitive
    assert_eq!(DocumentKind::from_path("BOOK.PDF"), Some(DocumentKind::Pdf));
    assert_eq!(DocumentKind::from_path("Notes.Txt"), Some(DocumentKind::Txt));
}

/// Test that unsupported or missing extensions yield no kind
#[test]
fn test_from_path_withUnsupportedExtensions_shouldReturnNone() {
    assert_eq!(DocumentKind::from_path("movie.mkv"), None);
    assert_eq!(DocumentKind::from_path("archive.tar.gz"), None);
    assert_eq!(DocumentKind::from_path("Makefile"), None);
    assert_eq!(DocumentKind::from_path(""), None);
}

/// Test per-kind size ceilings
#[test]
fn test_size_limit_withEachKind_shouldReturnCeiling() {
    assert_eq!(DocumentKind::Pdf.size_limit(), PDF_SIZE_LIMIT);
    assert_eq!(DocumentKind::Docx.size_limit(), DOCX_SIZE_LIMIT);
    assert_eq!(DocumentKind::Txt.size_limit(), OVERALL_SIZE_LIMIT);

    // PDF and DOCX ceilings sit below the overall ceiling
    assert!(PDF_SIZE_LIMIT < OVERALL_SIZE_LIMIT);
    assert!(DOCX_SIZE_LIMIT < PDF_SIZE_LIMIT);
}

/// Test round-tripping kinds through their string form
#[test]
fn test_from_str_withValidNames_shouldParseKind() -> Result<()> {
    assert_eq!(DocumentKind::from_str("pdf")?, DocumentKind::Pdf);
    assert_eq!(DocumentKind::from_str("DOCX")?, DocumentKind::Docx);
    assert_eq!(DocumentKind::from_str("txt")?, DocumentKind::Txt);

    assert_eq!(DocumentKind::Pdf.to_string(), "pdf");
    assert_eq!(DocumentKind::Docx.to_string(), "docx");
    assert_eq!(DocumentKind::Txt.to_string(), "txt");

    assert!(DocumentKind::from_str("epub").is_err());

    Ok(())
}

/// Test human-readable kind names
#[test]
fn test_display_name_withEachKind_shouldReturnReadableName() {
    assert_eq!(DocumentKind::Pdf.display_name(), "PDF");
    assert_eq!(DocumentKind::Docx.display_name(), "DOCX");
    assert_eq!(DocumentKind::Txt.display_name(), "plain text");
}

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    // Create a temporary test file
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(&temp_dir.path().to_path_buf(), "test_file_exists.tmp", "test content")?;

    // Test that file_exists works correctly
    assert!(FileManager::file_exists(test_file.to_str().unwrap()));

    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test that dir_exists returns true for existing directories
#[test]
fn test_dir_exists_withExistingDir_shouldReturnTrue() -> Result<()> {
    // Use the current directory which definitely exists
    let current_dir = ".";

    // Test that dir_exists works correctly
    assert!(FileManager::dir_exists(current_dir));

    Ok(())
}

/// Test that dir_exists returns false for non-existent directories
#[test]
fn test_dir_exists_withNonExistentDir_shouldReturnFalse() {
    assert!(!FileManager::dir_exists("./non_existent_directory_12345"));
}

/// Test that ensure_dir creates directories as needed
#[test]
fn test_ensure_dir_withNonExistentDir_shouldCreateDirectory() -> Result<()> {
    // Create a temporary directory for testing
    let temp_dir = common::create_temp_dir()?;
    let test_subdir = temp_dir.path().join("test_subdir");

    // Ensure the subdirectory exists (should create it)
    FileManager::ensure_dir(test_subdir.to_str().unwrap())?;

    // Verify the directory was created
    assert!(test_subdir.exists());
    assert!(test_subdir.is_dir());

    Ok(())
}

/// Test that file_size reports the byte length
#[test]
fn test_file_size_withKnownContent_shouldReturnByteCount() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(&temp_dir.path().to_path_buf(), "sized.txt", "12345")?;

    assert_eq!(FileManager::file_size(&test_file)?, 5);
    assert!(FileManager::file_size("missing_file_12345.txt").is_err());

    Ok(())
}

/// Test that read_to_string returns file content correctly
#[test]
fn test_read_to_string_withValidFile_shouldReturnContent() -> Result<()> {
    // Create a temporary test file
    let temp_dir = common::create_temp_dir()?;
    let content = "Hello, World!";
    let test_file = common::create_test_file(&temp_dir.path().to_path_buf(), "test_read_file.tmp", content)?;

    // Test read_to_string
    let read_content = FileManager::read_to_string(test_file.to_str().unwrap())?;
    assert_eq!(read_content, content);

    Ok(())
}

/// Test that write_to_file creates file with content correctly
#[test]
fn test_write_to_file_withValidInput_shouldCreateFileWithContent() -> Result<()> {
    // Create a temporary directory for testing
    let temp_dir = common::create_temp_dir()?;
    let test_file = temp_dir.path().join("nested").join("test_write_file.tmp");
    let content = "Test write content";

    // Test write_to_file, including parent directory creation
    FileManager::write_to_file(test_file.to_str().unwrap(), content)?;

    // Verify file was created with correct content
    assert!(test_file.exists());
    let read_content = fs::read_to_string(&test_file)?;
    assert_eq!(read_content, content);

    Ok(())
}

/// Test that find_documents only picks up supported kinds, recursively and sorted
#[test]
fn test_find_documents_withMixedTree_shouldReturnSupportedFilesSorted() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path().to_path_buf();
    let sub = root.join("chapter");
    FileManager::ensure_dir(&sub)?;

    common::create_test_file(&root, "b.txt", "text")?;
    common::create_test_file(&root, "a.pdf", "%PDF-1.4")?;
    common::create_test_file(&root, "skip.mkv", "video")?;
    common::create_test_file(&sub, "c.docx", "docx bytes")?;

    let found = FileManager::find_documents(&root)?;

    assert_eq!(found.len(), 3);
    assert_eq!(found[0], root.join("a.pdf"));
    assert_eq!(found[1], root.join("b.txt"));
    assert_eq!(found[2], sub.join("c.docx"));

    Ok(())
}
