use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFileStatus {
    pub requested_files: Vec<String>,
    pub included_files: Vec<String>,
    pub missing_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedContext {
    pub content: String,
    pub status: ContextFileStatus,
}

/// Reads project documents (architecture notes, review hints, ...) that are
/// handed to the provider alongside the diff.
pub struct ContextFetcher {
    work_dir: PathBuf,
}

impl ContextFetcher {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Unreadable files are reported in `missing_files` rather than failing.
    pub async fn load(&self, paths: &[String]) -> LoadedContext {
        let mut sections = Vec::new();
        let mut status = ContextFileStatus {
            requested_files: paths.to_vec(),
            ..Default::default()
        };

        for path in paths {
            match tokio::fs::read_to_string(self.resolve(path)).await {
                Ok(content) => {
                    sections.push(format!("## {}\n\n{}", path, content));
                    status.included_files.push(path.clone());
                }
                Err(err) => {
                    debug!("Context file {} not readable: {}", path, err);
                    status.missing_files.push(path.clone());
                }
            }
        }

        LoadedContext {
            content: sections.join(SECTION_SEPARATOR),
            status,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }
}
