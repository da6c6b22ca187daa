//! Reading documents from disk for ingest.
//!
//! The identifier of a document is its file name. Plain text is decoded as
//! UTF-8 when it is valid, otherwise with the detected legacy charset (GBK,
//! Shift_JIS, windows-1252, ...). PDF files contribute the text of their pages.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chardetng::EncodingDetector;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use knowledge_retrieval::{Document, IngestFailure};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Expand the given paths into a flat list of files.
///
/// Directories are walked recursively in file-name order, skipping hidden
/// entries. Plain paths are passed through unchanged, even if missing, so the
/// read reports them.
pub fn collect_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        for entry in WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!(root = %input.display(), error = %e, "Skipping unreadable entry"),
            }
        }
    }

    debug!(inputs = inputs.len(), files = files.len(), "Collected files");
    files
}

/// Decode raw file bytes as text.
///
/// UTF-8 (with or without BOM) is taken as is; anything else goes through
/// charset detection. Undecodable sequences become U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    // decode() also honours UTF-16 byte-order marks
    let (text, used, had_errors) = encoding.decode(bytes);
    debug!(
        encoding = used.name(),
        had_errors = had_errors,
        bytes = bytes.len(),
        "Decoded non-UTF-8 text"
    );
    text.into_owned()
}

/// Text of every page in page order, pages separated by a blank line.
///
/// Pages whose text cannot be extracted are skipped; a document with no
/// extractable text at all (e.g. a scan) is an error.
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| anyhow!("Failed to load PDF {}: {}", path.display(), e))?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page in &page_numbers {
        match doc.extract_text(&[*page]) {
            Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => debug!(path = %path.display(), page = *page, error = %e, "Skipping page"),
        }
    }

    if pages.is_empty() {
        bail!("no text content found in {}", path.display());
    }

    debug!(path = %path.display(), pages = page_numbers.len(), "Extracted PDF text");
    Ok(pages.join("\n\n"))
}

/// Identifier for a file: its file name.
pub fn identifier_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Read a single file into a document.
pub fn read_document(path: &Path) -> Result<Document> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    if extension.as_deref() == Some("pdf") {
        return Ok(Document::new(identifier_for(path), extract_pdf_text(path)?));
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::new(identifier_for(path), decode_text(&bytes)))
}

/// Read every file, splitting readable documents from failures.
pub fn read_documents(files: &[PathBuf]) -> (Vec<Document>, Vec<IngestFailure>) {
    let mut documents = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    for path in files {
        match read_document(path) {
            Ok(document) => documents.push(document),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read document");
                failures.push(IngestFailure {
                    identifier: identifier_for(path),
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    (documents, failures)
}
