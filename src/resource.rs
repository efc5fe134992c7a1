//! Resource providers: access to files referenced by definitions
//!
//! Each module owns two providers, one rooted at its config folder and one at
//! its content folder. The merge and digest code only use the two methods of
//! [`ResourceProvider`] and never assume a particular backing store.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::module::Source;

/// Read access to the resources of one module scope
pub trait ResourceProvider: fmt::Debug + Send + Sync {
    /// Whether `path`, as written in `source`, names an existing resource.
    fn has_resource(&self, source: &Source, path: &str) -> bool;

    /// Open the resource for reading.
    fn open_resource(&self, source: &Source, path: &str) -> Result<Box<dyn Read + Send + '_>>;
}

/// Resolve a resource reference to a path relative to the scope root.
///
/// Absolute references (`/images/a.png`) are taken as-is. Relative references
/// are resolved against the folder holding `source_path`. `.` and `..` are
/// folded; `..` never climbs above the scope root. The result always starts
/// with `/`.
pub fn resolve_resource_path(source_path: &str, reference: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !reference.starts_with('/') {
        let mut source_dirs: Vec<&str> = source_path.split('/').filter(|p| !p.is_empty()).collect();
        source_dirs.pop();
        parts.extend(source_dirs);
    }
    for part in reference.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// In-memory resources keyed by scope-relative path
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file. `path` is relative to the scope root.
    pub fn add_file(&mut self, path: &str, content: Vec<u8>) {
        self.files.insert(resolve_resource_path("", path), content);
    }

    /// Add a file with string content
    pub fn add_file_string(&mut self, path: &str, content: &str) {
        self.add_file(path, content.as_bytes().to_vec());
    }

    /// Builder-style variant of [`MemoryResources::add_file_string`].
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.add_file_string(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceProvider for MemoryResources {
    fn has_resource(&self, source: &Source, path: &str) -> bool {
        self.files
            .contains_key(&resolve_resource_path(source.path(), path))
    }

    fn open_resource(&self, source: &Source, path: &str) -> Result<Box<dyn Read + Send + '_>> {
        let resolved = resolve_resource_path(source.path(), path);
        match self.files.get(&resolved) {
            Some(content) => Ok(Box::new(Cursor::new(content.as_slice()))),
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no resource at {}", resolved),
            ))),
        }
    }
}

/// Resources read from a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, source: &Source, path: &str) -> PathBuf {
        let resolved = resolve_resource_path(source.path(), path);
        self.root.join(resolved.trim_start_matches('/'))
    }
}

impl ResourceProvider for DirectoryResources {
    fn has_resource(&self, source: &Source, path: &str) -> bool {
        self.locate(source, path).is_file()
    }

    fn open_resource(&self, source: &Source, path: &str) -> Result<Box<dyn Read + Send + '_>> {
        let file = fs::File::open(self.locate(source, path))?;
        Ok(Box::new(file))
    }
}
