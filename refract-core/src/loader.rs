// Source file loading: stat, then read with the configured encoding

use crate::Error;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// How source file contents are handed to the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    /// Decode the file as UTF-8 text (default)
    #[default]
    Utf8,
    /// Hand the transform the raw bytes
    Raw,
}

/// File contents in the configured encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl SourceContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SourceContent::Text(s) => s.as_bytes(),
            SourceContent::Bytes(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// A source file located on disk, ready for transformation.
///
/// `content` is `None` in path-only mode, where the transform receives just
/// the resolved path and does its own reading.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub content: Option<SourceContent>,
}

/// Stat `path`, returning `None` when it is absent or not a regular file.
///
/// Absence is indistinguishable from an unmatched request further up: the
/// engine passes through either way. Stat-level failures (including
/// permission errors on a parent directory) count as absence too.
pub async fn stat(path: &Path) -> Option<std::fs::Metadata> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta),
        _ => None,
    }
}

/// Load the file at `path`.
///
/// Returns `Ok(None)` when the file is absent or not regular. A read failure
/// after a successful stat (permissions, deletion race, undecodable text in
/// UTF-8 mode) is NOT a pass-through: the asset exists but the pipeline
/// cannot process it, so the error propagates.
pub async fn load(
    path: &Path,
    encoding: SourceEncoding,
    path_only: bool,
) -> Result<Option<SourceFile>, Error> {
    let Some(meta) = stat(path).await else {
        return Ok(None);
    };
    let modified = meta.modified().ok();

    let content = if path_only {
        None
    } else {
        Some(read(path, encoding).await?)
    };

    Ok(Some(SourceFile {
        path: path.to_path_buf(),
        modified,
        content,
    }))
}

async fn read(path: &Path, encoding: SourceEncoding) -> Result<SourceContent, Error> {
    match encoding {
        SourceEncoding::Utf8 => {
            let text = tokio::fs::read_to_string(path).await?;
            Ok(SourceContent::Text(text))
        }
        SourceEncoding::Raw => {
            let bytes = tokio::fs::read(path).await?;
            Ok(SourceContent::Bytes(bytes))
        }
    }
}
