//! Configuration loading and management.

use crate::cli::Args;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;
use std::path::Path;
use tmpl_compiler::CompilerOptions;

/// Configuration file looked up in the template directory.
pub const CONFIG_FILE: &str = "tmplc.json";

/// Extension of parse tree files when none is configured.
pub const DEFAULT_EXTENSION: &str = ".tmpl.json";

/// Contents of `tmplc.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    /// Parse tree file extensions.
    pub extensions: Option<Vec<String>>,
    /// Extra ignore patterns (glob).
    pub ignore: Vec<String>,
    /// `keyVar` and `valueVar`.
    #[serde(flatten)]
    pub compiler: CompilerOptions,
}

/// Configuration for tmplc.
#[derive(Debug, Clone)]
pub struct Config {
    /// Template directory.
    pub root: Utf8PathBuf,
    /// File extensions to process, each with a leading dot.
    pub extensions: Vec<String>,
    /// Ignore patterns.
    pub ignore_patterns: Vec<String>,
    ignore: GlobSet,
    /// Options handed to the compiler.
    pub compiler: CompilerOptions,
}

impl Config {
    /// Load configuration from CLI arguments and the template directory.
    pub fn load(root: &Path, args: &Args) -> Result<Self> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).map_err(|path| {
            miette::miette!("Template directory is not valid UTF-8: {}", path.display())
        })?;
        let file = read_file_config(&root.join(CONFIG_FILE))?;

        let extensions = file
            .extensions
            .unwrap_or_else(|| vec![DEFAULT_EXTENSION.to_string()])
            .into_iter()
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();

        let mut ignore_patterns = vec!["**/node_modules/**".to_string(), "**/.git/**".to_string()];
        ignore_patterns.extend(file.ignore);
        ignore_patterns.extend(args.ignore.iter().cloned());
        let ignore = build_globset(&ignore_patterns)?;

        Ok(Self {
            root,
            extensions,
            ignore_patterns,
            ignore,
            compiler: file.compiler,
        })
    }

    /// Path of the configuration file for this template directory.
    pub fn config_path(&self) -> Utf8PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Check if a file should be processed.
    pub fn should_process(&self, path: &Utf8Path) -> bool {
        if self.matching_extension(path.as_str()).is_none() {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self.ignore.is_match(relative.as_str())
    }

    /// Registry name of a template file: its path relative to the
    /// template directory, without extension, `/`-separated.
    pub fn template_name(&self, path: &Utf8Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.as_str();
        let ext = self.matching_extension(relative)?;
        let stem = &relative[..relative.len() - ext.len()];
        if stem.is_empty() {
            return None;
        }
        Some(stem.replace('\\', "/"))
    }

    /// Longest configured extension `path` ends with.
    fn matching_extension(&self, path: &str) -> Option<&str> {
        self.extensions
            .iter()
            .filter(|ext| path.ends_with(ext.as_str()))
            .max_by_key(|ext| ext.len())
            .map(String::as_str)
    }
}

fn read_file_config(path: &Utf8Path) -> Result<FileConfig> {
    if !path.is_file() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Invalid configuration in {}", path))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid ignore pattern `{}`", pattern))?;
        builder.add(glob);
    }
    builder.build().into_diagnostic()
}
