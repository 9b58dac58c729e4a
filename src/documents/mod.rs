//! Extension-keyed text extraction for local documents.
//!
//! Only extractors whose backing support is compiled in are registered.
//! Known office formats without one report [`DocumentError::Unavailable`]
//! instead of failing hard.

use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Formats the dispatcher knows about but cannot read without an extractor.
pub const OFFICE_EXTENSIONS: &[&str] = &["pptx", "docx", "xlsx", "pdf"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("no extractor available for .{0} files")]
    Unavailable(String),

    #[error("error reading file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Reads the file as UTF-8, replacing invalid sequences.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, DocumentError> {
        let bytes = fs::read(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Default)]
pub struct DocumentTextDispatcher {
    extractors: HashMap<String, Box<dyn TextExtractor>>,
    fallback: Option<Box<dyn TextExtractor>>,
}

impl DocumentTextDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain text for every extension that is not a known office format.
    pub fn with_defaults() -> Self {
        let mut d = Self::new();
        d.fallback = Some(Box::new(PlainTextExtractor));
        d
    }

    pub fn register(&mut self, extension: &str, extractor: Box<dyn TextExtractor>) {
        self.extractors
            .insert(extension.trim_start_matches('.').to_ascii_lowercase(), extractor);
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extractors.contains_key(&ext)
            || (self.fallback.is_some() && !OFFICE_EXTENSIONS.contains(&ext.as_str()))
    }

    pub fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        if !path.exists() {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let extractor = match self.extractors.get(&ext) {
            Some(x) => x.as_ref(),
            None if OFFICE_EXTENSIONS.contains(&ext.as_str()) => {
                return Err(DocumentError::Unavailable(ext));
            }
            None => self
                .fallback
                .as_deref()
                .ok_or_else(|| DocumentError::Unavailable(ext.clone()))?,
        };
        debug!("extracting text from {}", path.display());
        extractor.extract(path)
    }
}
