use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_SUFFIX: &str = ".bss";

/// Reads stylesheet sources by logical file name (suffix included).
pub trait SourceLoader {
    fn load(&self, name: &str) -> Result<String>;
}

/// Appends `suffix` unless the name already ends with it.
pub fn with_suffix(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Resolves names relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.base_dir.join(name);
        fs::read_to_string(&path).map_err(|e| Error::resolution(path.display().to_string(), e))
    }
}

/// In-memory sources, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        self.sources.get(name).cloned().ok_or_else(|| {
            Error::resolution(
                name,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such stylesheet"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/imports")
    }

    #[test]
    fn suffix_is_appended_once() {
        assert_eq!(with_suffix("base", DEFAULT_SUFFIX), "base.bss");
        assert_eq!(with_suffix("base.bss", DEFAULT_SUFFIX), "base.bss");
    }

    #[test]
    fn reads_relative_to_base_dir() {
        let loader = FsLoader::new(fixture_dir());
        let source = loader.load("a.bss").expect("load a.bss");
        assert!(source.contains(".a"));
    }

    #[test]
    fn missing_file_error() {
        let loader = FsLoader::new(fixture_dir());
        let err = loader.load("missing.bss").unwrap_err();
        assert!(err.to_string().starts_with("Cannot read file"));
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[test]
    fn memory_loader_serves_inserted_sources() {
        let loader = MemoryLoader::new().with("x.bss", "a { b: c }");
        assert_eq!(loader.load("x.bss").expect("load"), "a { b: c }");
        assert!(loader.load("y.bss").is_err());
    }
}
