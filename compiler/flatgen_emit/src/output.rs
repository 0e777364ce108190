//! Rendered sources and their on-disk layout.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

/// Failure while writing generated sources.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One rendered output file, named relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// Every file one generation run renders, in write order.
#[derive(Debug, Default)]
pub struct ModuleSources {
    pub files: Vec<SourceFile>,
}

impl ModuleSources {
    pub fn push(&mut self, name: impl Into<String>, text: String) {
        self.files.push(SourceFile {
            name: name.into(),
            text,
        });
    }

    /// Find a rendered file by name.
    pub fn get(&self, name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Write every file under `dir`, creating the directory first.
    pub fn write_to(&self, dir: &Path) -> Result<(), EmitError> {
        fs::create_dir_all(dir).map_err(|source| EmitError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for file in &self.files {
            let path = dir.join(&file.name);
            fs::write(&path, &file.text).map_err(|source| EmitError::Io {
                path: path.clone(),
                source,
            })?;
        }
        info!(dir = %dir.display(), files = self.files.len(), "sources written");
        Ok(())
    }
}
