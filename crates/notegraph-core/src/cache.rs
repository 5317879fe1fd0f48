use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CorpusError;
use crate::links::{Link, LinkGraph};
use crate::model::Document;
use crate::store::{Corpus, Snapshot};
use crate::vfs::FileSystem;

/// Serialized corpus: accepted documents plus the link graph computed
/// from them. Links are informational; they are recomputed on restore.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CorpusState {
    pub version: u32,
    pub documents: Vec<Document>,
    pub links: Vec<Link>,
}

impl CorpusState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn capture(snapshot: &Snapshot) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            documents: snapshot.iter().map(|doc| (**doc).clone()).collect(),
            links: LinkGraph::resolve(snapshot).links().to_vec(),
        }
    }

    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self, CorpusError> {
        let content = fs.read_to_string(path)?;
        let state: CorpusState = serde_json::from_str(&content)?;

        if state.version != Self::CURRENT_VERSION {
            return Err(CorpusError::SnapshotVersion {
                found: state.version,
                expected: Self::CURRENT_VERSION,
            });
        }

        log::debug!("loaded {} documents from {:?}", state.documents.len(), path);
        Ok(state)
    }

    pub fn save(&self, path: &Path, fs: &dyn FileSystem) -> Result<(), CorpusError> {
        let buffer = serde_json::to_vec_pretty(self)?;
        fs.write_all(path, &buffer)?;
        log::debug!("saved {} documents to {:?}", self.documents.len(), path);
        Ok(())
    }

    pub fn into_corpus(self) -> Corpus {
        Corpus::from_documents(self.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotegraphConfig;
    use crate::model::DocId;
    use crate::pipeline::{Pipeline, SourceDocument};
    use crate::query::QueryDirective;
    use crate::vfs::PhysicalFileSystem;
    use tempfile::TempDir;

    const NOTE: &str = "---\ntitle: Note\ncategory: a\ntags: [a]\ndate-created: 2023-01-01\ndate-updated: 2023-01-02\nstatus: evergreen\n---\nSee [[Other]] and [[Missing]].";
    const OTHER: &str = "---\ntitle: Other\ncategory: a\ntags: [a]\ndate-created: 2023-01-01\ndate-updated: 2023-01-01\n---\n```query\nLIST WHERE status = evergreen\n```\n";

    fn populated() -> Pipeline {
        let pipeline = Pipeline::new(&NotegraphConfig::default());
        pipeline.run(vec![
            SourceDocument::new("a/Note", NOTE),
            SourceDocument::new("a/Other", OTHER),
        ]);
        pipeline
    }

    #[test]
    fn test_save_and_restore() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".notegraph/corpus.json");
        let pipeline = populated();

        let state = CorpusState::capture(&pipeline.corpus().snapshot());
        assert_eq!(state.links.len(), 2);
        state.save(&path, &PhysicalFileSystem).unwrap();

        let loaded = CorpusState::load(&path, &PhysicalFileSystem).unwrap();
        assert_eq!(loaded.documents, state.documents);

        let restored = Pipeline::with_corpus(&NotegraphConfig::default(), loaded.into_corpus());
        let note = restored.corpus().get(&DocId::new("Note")).unwrap();
        assert_eq!(note.links_out.len(), 2);

        let graph = restored.links();
        assert_eq!(graph.links(), state.links.as_slice());
        assert_eq!(graph.dangling().len(), 1);

        let result = restored
            .query(&QueryDirective::parse("LIST WHERE status = evergreen"))
            .unwrap();
        assert_eq!(result.ids(), vec!["Note"]);
        let directives = restored.evaluate_directives(&restored.corpus().snapshot());
        assert_eq!(directives[0].result.as_ref().unwrap().ids(), vec!["Note"]);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corpus.json");
        let mut state = CorpusState::capture(&populated().corpus().snapshot());
        state.version = 99;
        state.save(&path, &PhysicalFileSystem).unwrap();

        match CorpusState::load(&path, &PhysicalFileSystem) {
            Err(CorpusError::SnapshotVersion { found, expected }) => {
                assert_eq!(found, 99);
                assert_eq!(expected, CorpusState::CURRENT_VERSION);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corpus.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            CorpusState::load(&path, &PhysicalFileSystem),
            Err(CorpusError::Snapshot(_))
        ));
        assert!(matches!(
            CorpusState::load(&temp_dir.path().join("absent.json"), &PhysicalFileSystem),
            Err(CorpusError::Io(_))
        ));
    }
}
