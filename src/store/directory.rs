//! # Directory-Backed Store
//!
//! Layout:
//!
//! ```text
//! <root>/
//! └── <cleaned volume id>/
//!     ├── 00000001.txt
//!     ├── 00000002.txt
//!     └── mets.xml
//! ```
//!
//! Page files are eight-digit sequences with a `.txt` suffix; the page count
//! is the number of such files. Every other regular file is a metadata unit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{VolumeInfo, VolumeStore};
use crate::coordinates::{clean_volume_id, page_sequence_name};
use crate::errors::{AccessError, AccessResult};
use crate::retrieval::ContentReader;

const PAGE_SUFFIX: &str = ".txt";

/// Volume store over a local directory tree
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn volume_dir(&self, volume_id: &str) -> AccessResult<PathBuf> {
        let cleaned = clean_volume_id(volume_id);
        if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
            return Err(AccessError::key_not_found(volume_id));
        }

        let dir = self.root.join(cleaned);
        if !dir.is_dir() {
            return Err(AccessError::key_not_found(volume_id));
        }
        Ok(dir)
    }

    fn list_files(dir: &Path) -> AccessResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_failure(dir, e))? {
            let entry = entry.map_err(|e| io_failure(dir, e))?;
            let is_file = entry
                .file_type()
                .map(|t| t.is_file())
                .map_err(|e| io_failure(dir, e))?;
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn is_page_file(name: &str) -> bool {
    name.strip_suffix(PAGE_SUFFIX)
        .map(|stem| stem.len() == 8 && stem.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

fn io_failure(path: &Path, err: io::Error) -> AccessError {
    AccessError::repository(format!("I/O error at {}: {}", path.display(), err))
}

impl VolumeStore for DirectoryStore {
    fn volume_info(&self, volume_id: &str) -> AccessResult<VolumeInfo> {
        let dir = self.volume_dir(volume_id)?;
        let page_count = Self::list_files(&dir)?
            .iter()
            .filter(|name| is_page_file(name))
            .count();
        Ok(VolumeInfo::new(volume_id, page_count as u32))
    }

    fn page(&self, volume_id: &str, sequence: u32) -> AccessResult<Vec<u8>> {
        let dir = self.volume_dir(volume_id)?;
        let path = dir.join(format!("{}{}", page_sequence_name(sequence), PAGE_SUFFIX));

        fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AccessError::key_not_found(format!("{}[{}]", volume_id, sequence))
            } else {
                io_failure(&path, e)
            }
        })
    }

    fn metadata(&self, volume_id: &str) -> AccessResult<Vec<ContentReader>> {
        let dir = self.volume_dir(volume_id)?;
        let mut readers = Vec::new();

        for name in Self::list_files(&dir)? {
            if is_page_file(&name) {
                continue;
            }
            let path = dir.join(&name);
            let content = fs::read(&path).map_err(|e| io_failure(&path, e))?;
            readers.push(ContentReader::new(name, content));
        }

        Ok(readers)
    }
}
