use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::model::{DocId, Document};
use crate::utils::{normalize_scope, scope_covers};

/// Immutable view of the corpus at one point in time.
///
/// Documents are shared behind `Arc`, so a snapshot is cheap to clone and a
/// reader holding one never observes later mutations.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    documents: BTreeMap<DocId, Arc<Document>>,
    path_map: HashMap<String, DocId>,
    /// category prefix -> documents directly in that category
    categories: BTreeMap<String, BTreeSet<DocId>>,
}

impl Snapshot {
    pub fn get(&self, id: &DocId) -> Option<Arc<Document>> {
        self.documents.get(id).cloned()
    }

    pub fn get_by_path(&self, path: &str) -> Option<Arc<Document>> {
        self.path_map.get(path).and_then(|id| self.get(id))
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents, ordered by identifier.
    pub fn all(&self) -> Vec<Arc<Document>> {
        self.documents.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    /// Documents whose category lies under `prefix` (whole segments), ordered
    /// by identifier. An empty prefix selects the whole corpus.
    pub fn by_category(&self, prefix: &str) -> Vec<Arc<Document>> {
        let prefix = normalize_scope(prefix);
        if prefix.is_empty() {
            return self.all();
        }

        let mut ids: Vec<&DocId> = self
            .categories
            .range(prefix.to_string()..)
            .take_while(|(category, _)| category.starts_with(prefix))
            .filter(|(category, _)| scope_covers(prefix, category))
            .flat_map(|(_, ids)| ids.iter())
            .collect();
        ids.sort();

        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Category prefixes that currently hold at least one document.
    pub fn categories(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    /// Every metadata key used by at least one document.
    pub fn field_names(&self) -> BTreeSet<String> {
        self.documents
            .values()
            .flat_map(|doc| doc.metadata.keys().cloned())
            .collect()
    }

    fn insert(&mut self, doc: Arc<Document>) -> Option<Arc<Document>> {
        let previous = self.detach(&doc.id);
        self.path_map.insert(doc.path.clone(), doc.id.clone());
        self.categories
            .entry(doc.category_prefix().to_string())
            .or_default()
            .insert(doc.id.clone());
        self.documents.insert(doc.id.clone(), doc);
        previous
    }

    fn detach(&mut self, id: &DocId) -> Option<Arc<Document>> {
        let old = self.documents.remove(id)?;
        if self.path_map.get(&old.path) == Some(id) {
            self.path_map.remove(&old.path);
        }
        let category = old.category_prefix();
        if let Some(ids) = self.categories.get_mut(category) {
            ids.remove(id);
            if ids.is_empty() {
                self.categories.remove(category);
            }
        }
        Some(old)
    }
}

/// The corpus store, owned by the index builder.
///
/// Each mutation swaps whole documents under a single write lock; readers
/// take a `Snapshot` and never see a document with old metadata but new
/// links, or the reverse.
#[derive(Debug, Default)]
pub struct Corpus {
    current: RwLock<Arc<Snapshot>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut snapshot = Snapshot::default();
        for doc in documents {
            snapshot.insert(Arc::new(doc));
        }
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Current state as an immutable view.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // clones only when a reader still holds the previous snapshot
        f(Arc::make_mut(&mut guard))
    }

    /// Insert or replace the document with the same identifier.
    /// Returns the replaced version, if any.
    pub fn upsert(&self, doc: Document) -> Option<Arc<Document>> {
        let doc = Arc::new(doc);
        self.mutate(|snapshot| snapshot.insert(doc))
    }

    pub fn remove(&self, id: &DocId) -> Option<Arc<Document>> {
        self.mutate(|snapshot| snapshot.detach(id))
    }

    pub fn remove_path(&self, path: &str) -> Option<Arc<Document>> {
        self.mutate(|snapshot| {
            let id = snapshot.path_map.get(path)?.clone();
            snapshot.detach(&id)
        })
    }

    /// Drop every document whose identifier is not in `keep`.
    pub fn retain(&self, keep: &BTreeSet<DocId>) -> Vec<Arc<Document>> {
        self.mutate(|snapshot| {
            let stale: Vec<DocId> = snapshot
                .documents
                .keys()
                .filter(|id| !keep.contains(*id))
                .cloned()
                .collect();
            stale.iter().filter_map(|id| snapshot.detach(id)).collect()
        })
    }

    pub fn get(&self, id: &DocId) -> Option<Arc<Document>> {
        self.snapshot().get(id)
    }

    pub fn all(&self) -> Vec<Arc<Document>> {
        self.snapshot().all()
    }

    pub fn by_category(&self, prefix: &str) -> Vec<Arc<Document>> {
        self.snapshot().by_category(prefix)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
