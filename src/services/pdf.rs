use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(1000).unwrap();

/// A titled slice of one page's extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub snippet: String,
}

impl Snippet {
    fn new(page: usize, part: usize, text: &str) -> Self {
        Self {
            title: format!("Page {page} Part {part}"),
            snippet: text.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentOpenError {
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open PDF: {0}")]
    InvalidPdf(String),
}

/// Chunk the PDF at `path`. The file is read in full and closed before
/// extraction starts.
pub fn chunk_pdf(
    path: impl AsRef<Path>,
    chunk_size: NonZeroUsize,
) -> Result<Vec<Snippet>, DocumentOpenError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| DocumentOpenError::Read {
        path: path.display().to_string(),
        source,
    })?;
    chunk_pdf_bytes(&bytes, chunk_size)
}

pub fn chunk_pdf_bytes(
    pdf_bytes: &[u8],
    chunk_size: NonZeroUsize,
) -> Result<Vec<Snippet>, DocumentOpenError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| DocumentOpenError::InvalidPdf(e.to_string()))?;

    tracing::debug!("Extracted {} pages from PDF", pages.len());
    Ok(chunk_pages(&pages, chunk_size))
}

/// Chunk already-extracted page texts, numbering pages from 1 in slice order.
pub fn chunk_pages<S: AsRef<str>>(pages: &[S], chunk_size: NonZeroUsize) -> Vec<Snippet> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(idx, text)| chunk_page(idx + 1, text.as_ref(), chunk_size))
        .collect()
}

/// Split one page into consecutive runs of `chunk_size` characters; the last
/// run may be shorter.
pub fn chunk_page(page: usize, text: &str, chunk_size: NonZeroUsize) -> Vec<Snippet> {
    let starts: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .step_by(chunk_size.get())
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            let end = starts.get(k + 1).copied().unwrap_or(text.len());
            Snippet::new(page, k + 1, &text[start..end])
        })
        .collect()
}
