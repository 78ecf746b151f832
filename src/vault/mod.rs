// File store adapter
//
// Reads and writes notes under one directory of the vault. Writes go to a
// sibling temp file that is renamed over the target, so a failed write never
// leaves a truncated note behind. Parent directories are created as needed.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::VaultError;

mod frontmatter;
mod markdown;

pub use frontmatter::{split_frontmatter, FieldValue, Frontmatter, VaultFile};
pub use markdown::{format_tag, sanitize_filename, wiki_link, MAX_STEM_CHARS};

/// Markdown file extension used for every note
pub const NOTE_EXTENSION: &str = "md";

/// A directory of notes
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a store-relative path
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn exists(&self, relative: &Path) -> bool {
        self.resolve(relative).exists()
    }

    /// Read raw text
    pub fn read_text(&self, relative: &Path) -> Result<String, VaultError> {
        let path = self.resolve(relative);
        fs::read_to_string(&path).map_err(|source| VaultError::FileRead { path, source })
    }

    /// Read and parse a note
    pub fn read(&self, relative: &Path) -> Result<VaultFile, VaultError> {
        let text = self.read_text(relative)?;
        VaultFile::parse(relative, &text)
    }

    /// Write raw text, replacing any existing file
    pub fn write_text(&self, relative: &Path, content: &str) -> Result<PathBuf, VaultError> {
        let path = self.resolve(relative);
        let temp_path = temp_path_for(&path);
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        };
        match write() {
            Ok(()) => {
                tracing::debug!("Wrote {} ({} bytes)", path.display(), content.len());
                Ok(path)
            }
            Err(source) => {
                if temp_path.is_file() {
                    if let Err(e) = fs::remove_file(&temp_path) {
                        tracing::warn!("Could not remove {}: {}", temp_path.display(), e);
                    }
                }
                Err(VaultError::FileWrite { path, source })
            }
        }
    }

    /// Write a note, returning its absolute path
    pub fn write(&self, file: &VaultFile) -> Result<PathBuf, VaultError> {
        self.write_text(&file.path, &file.to_markdown())
    }
}

/// Sibling file a note is staged in before it is renamed into place
pub fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension(format!("{}.tmp", NOTE_EXTENSION))
}
