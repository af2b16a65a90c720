use serde::Serialize;

use crate::services::pdf::Snippet;

#[derive(Debug, Serialize)]
pub struct DocumentUploadResponse {
    pub filename: String,
    pub snippet_count: usize,
    pub titles: Vec<String>,
}

impl DocumentUploadResponse {
    pub fn new(filename: String, snippets: &[Snippet]) -> Self {
        Self {
            filename,
            snippet_count: snippets.len(),
            titles: snippets.iter().map(|s| s.title.clone()).collect(),
        }
    }
}
