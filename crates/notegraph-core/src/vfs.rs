use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::CorpusError;
use crate::pipeline::SourceDocument;
use crate::utils::logical_path;

/// Abstract interface for file system operations.
pub trait FileSystem: Send + Sync {
    /// Read the entire contents of a file into a string.
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Write a whole file, creating parent directories as needed.
    fn write_all(&self, path: &Path, content: &[u8]) -> std::io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// List all files with the given extension under the root directory.
    /// This should be a recursive search.
    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf>;
}

/// Standard implementation of FileSystem using std::fs and walkdir.
pub struct PhysicalFileSystem;

impl FileSystem for PhysicalFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_all(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_files(&self, root: &Path, extension: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == extension {
                        files.push(path.to_path_buf());
                    }
                }
            }
        }

        files
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, CorpusError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Collect `(logical path, raw text)` pairs for every document under `root`.
///
/// Unreadable files are logged and skipped; they never abort the scan.
pub fn load_sources(
    fs: &dyn FileSystem,
    root: &Path,
    config: &CorpusConfig,
) -> Result<Vec<SourceDocument>, CorpusError> {
    let ignore = build_ignore_set(&config.ignore_patterns)?;

    let mut files = Vec::new();
    for ext in &config.extensions {
        files.extend(fs.list_files(root, ext));
    }
    files.sort();
    files.dedup();

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        let Ok(relative) = file.strip_prefix(root) else {
            continue;
        };
        if ignore.is_match(relative) {
            log::debug!("ignoring {:?}", relative);
            continue;
        }

        match fs.read_to_string(&file) {
            Ok(text) => {
                let mut path = logical_path(relative);
                for ext in &config.extensions {
                    if let Some(stripped) = path.strip_suffix(&format!(".{ext}")) {
                        path = stripped.to_string();
                        break;
                    }
                }
                sources.push(SourceDocument { path, text });
            }
            Err(e) => log::warn!("skipping unreadable file {:?}: {}", file, e),
        }
    }

    log::debug!("found {} documents under {:?}", sources.len(), root);
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_sources_respects_ignore_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("lang/rust")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("lang/rust/Traits.md"), "# Traits").unwrap();
        fs::write(root.join("Home.md"), "# Home").unwrap();
        fs::write(root.join(".obsidian/Workspace.md"), "ignored").unwrap();
        fs::write(root.join("notes.txt"), "not a document").unwrap();

        let sources = load_sources(&PhysicalFileSystem, root, &CorpusConfig::default()).unwrap();
        let paths: Vec<&str> = sources.iter().map(|s| s.path.as_str()).collect();

        assert_eq!(paths, vec!["Home", "lang/rust/Traits"]);
        assert_eq!(sources[1].text, "# Traits");
    }

    #[test]
    fn test_invalid_ignore_pattern_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = CorpusConfig {
            ignore_patterns: vec!["[unclosed".to_string()],
            ..CorpusConfig::default()
        };
        let result = load_sources(&PhysicalFileSystem, temp_dir.path(), &config);
        assert!(matches!(result, Err(CorpusError::Pattern(_))));
    }
}
