//! Document loading.
//!
//! Reads plain-text and Markdown files from disk into `Document` values.
//! Missing files, unsupported formats and oversized files are skipped with a
//! warning rather than failing the batch.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use uuid::Uuid;

use crate::config::{MAX_FILE_SIZE, SUPPORTED_FORMATS};

/// A loaded document. Immutable after load; discarded once chunked.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub source_path: PathBuf,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Load every readable, supported file among `paths`.
pub fn load_documents(paths: &[PathBuf]) -> Vec<Document> {
    let mut documents = Vec::new();

    for path in paths {
        if !path.exists() {
            tracing::warn!("file {} does not exist, skipping", path.display());
            continue;
        }

        if !is_supported(path) {
            tracing::warn!("unsupported file format {}, skipping", path.display());
            continue;
        }

        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(err) => {
                tracing::warn!("could not stat {}: {}, skipping", path.display(), err);
                continue;
            }
        };
        if size > MAX_FILE_SIZE {
            tracing::warn!(
                "file {} exceeds the {} byte limit, skipping",
                path.display(),
                MAX_FILE_SIZE
            );
            continue;
        }

        match fs::read_to_string(path) {
            Ok(text) => {
                let source = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                documents.push(Document {
                    id: Uuid::new_v4().to_string(),
                    source_path: path.clone(),
                    metadata: json!({
                        "source": source,
                        "path": path.display().to_string(),
                        "file_size": size,
                    }),
                    text,
                });
                tracing::info!("loaded document {}", path.display());
            }
            Err(err) => {
                tracing::warn!("failed to read {}: {}, skipping", path.display(), err);
            }
        }
    }

    documents
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_FORMATS.iter().any(|fmt| *fmt == ext)
        })
        .unwrap_or(false)
}
