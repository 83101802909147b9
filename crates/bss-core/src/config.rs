use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::loader::DEFAULT_SUFFIX;

/// Compile settings, loadable from a JSON file. Missing keys keep their
/// defaults.
///
/// ```json
/// { "minify": true, "base_dir": "styles", "suffix": ".bss" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Drop optional line breaks and indentation from the output.
    pub minify: bool,
    /// Directory imports are resolved against. Defaults to the directory of
    /// the input file.
    pub base_dir: Option<PathBuf>,
    /// File suffix appended to import names that lack it.
    pub suffix: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            minify: false,
            base_dir: None,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl CompileOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&data).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
