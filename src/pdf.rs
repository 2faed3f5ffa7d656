//! PDF page-text extraction wrapper
//!
//! Wraps the pdf-extract crate behind the one capability the matcher needs:
//! given a path, produce per-page plain text. An unreadable or malformed
//! PDF is a data condition here, reported as `None` and logged by the
//! caller, never an error that stops a run.

use std::path::Path;

/// Extract per-page text from a PDF on disk.
///
/// Returns `None` when the file is missing, encrypted, scanned-image-only,
/// or otherwise unparseable.
pub fn extract_pages(path: &Path) -> Option<Vec<String>> {
    if !path.is_file() {
        return None;
    }
    match pdf_extract::extract_text_by_pages(path) {
        Ok(pages) => Some(pages),
        Err(e) => {
            eprintln!("[scan] failed to parse {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_none() {
        assert!(extract_pages(Path::new("/nonexistent/paper.pdf")).is_none());
    }

    #[test]
    fn test_garbage_file_is_none() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pdf at all").unwrap();
        assert!(extract_pages(file.path()).is_none());
    }
}
