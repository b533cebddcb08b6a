// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Source files every parser is benchmarked against.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read corpus directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One source file of the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub name: String,
    pub contents: String,
}

/// Every file with a given extension in one directory, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    files: Vec<CorpusFile>,
}

impl Corpus {
    /// Load every `*.{extension}` file directly inside `dir`.
    ///
    /// Files that cannot be read as UTF-8 text are logged and skipped.
    pub fn load(dir: impl AsRef<Path>, extension: &str) -> Result<Self, CorpusError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| CorpusError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                    continue;
                }
            };

            if !path.is_file() || path.extension().map_or(true, |e| e != extension) {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            match fs::read_to_string(&path) {
                Ok(contents) => files.push(CorpusFile { name, contents }),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to load corpus file")
                }
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!(dir = %dir.display(), files = files.len(), "Loaded corpus");

        Ok(Self { files })
    }

    pub fn from_files(mut files: Vec<CorpusFile>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self { files }
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
