use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CorpusError;
use crate::parser::WikiLinkFormat;
use crate::vfs::FileSystem;

/// File name looked up at the corpus root.
pub const CONFIG_FILE_NAME: &str = "notegraph.yml";

/// Top-level configuration for Notegraph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotegraphConfig {
    pub corpus: CorpusConfig,
    pub schema: SchemaConfig,
    pub links: LinkConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

/// Corpus-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusConfig {
    /// Name of the knowledge base
    pub name: String,
    /// File extensions treated as documents
    pub extensions: Vec<String>,
    /// Ignore patterns (glob syntax), matched against corpus-relative paths
    pub ignore_patterns: Vec<String>,
    /// Where `snapshot` writes the serialized corpus, relative to the root
    pub snapshot_path: PathBuf,
}

/// Metadata schema settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Tag that marks a category's index document
    pub index_tag: String,
    /// Allowed `status` values (content maturity)
    pub status_values: Vec<String>,
    /// Allowed `difficulty` values
    pub difficulty_values: Vec<String>,
    /// Extra required fields for topic documents
    pub required_topic_fields: Vec<String>,
    /// Extra required fields for index documents
    pub required_index_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// `target-first` ([[target|alias]]) or `alias-first` ([[alias|target]])
    pub format: WikiLinkFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Fence info strings that mark a code block as a query directive
    pub fence_tags: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether to log a summary line after each batch run
    pub show_summary: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            name: "Notegraph Corpus".to_string(),
            extensions: vec!["md".to_string()],
            ignore_patterns: vec![
                "**/.git/**".to_string(),
                "**/.obsidian/**".to_string(),
                "**/node_modules/**".to_string(),
            ],
            snapshot_path: PathBuf::from(".notegraph/corpus.json"),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            index_tag: "index".to_string(),
            status_values: vec![
                "seedling".to_string(),
                "budding".to_string(),
                "evergreen".to_string(),
            ],
            difficulty_values: vec![
                "beginner".to_string(),
                "intermediate".to_string(),
                "advanced".to_string(),
            ],
            required_topic_fields: Vec::new(),
            required_index_fields: Vec::new(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fence_tags: vec!["query".to_string(), "dataview".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

impl NotegraphConfig {
    /// Load config from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Read `notegraph.yml` from the corpus root, falling back to defaults
    /// when the file does not exist.
    pub fn load(root: &Path, fs: &dyn FileSystem) -> Result<Self, CorpusError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !fs.exists(&path) {
            log::debug!("no {} under {:?}, using defaults", CONFIG_FILE_NAME, root);
            return Ok(Self::default());
        }
        let content = fs.read_to_string(&path)?;
        Ok(Self::from_yaml(&content)?)
    }
}
