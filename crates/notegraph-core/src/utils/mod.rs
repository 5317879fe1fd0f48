pub mod time;

use crate::model::DocId;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Normalize a corpus-relative file path to a logical document path.
///
/// Converts a file path to a normalized string by:
/// - Converting backslashes to forward slashes (Windows compatibility)
/// - Removing the `.md` extension
/// - Dropping leading `./` and `/`
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use notegraph_core::utils::logical_path;
///
/// assert_eq!(logical_path(Path::new("data-structures/Linked List.md")), "data-structures/Linked List");
/// assert_eq!(logical_path(Path::new("./note.md")), "note");
/// ```
pub fn logical_path(path: &Path) -> String {
    let mut s = path.to_string_lossy().to_string();
    if std::path::MAIN_SEPARATOR == '\\' {
        s = s.replace('\\', "/");
    }
    let s = s.strip_suffix(".md").unwrap_or(&s);
    let s = s.trim_start_matches("./").trim_start_matches('/');
    s.to_string()
}

/// Identifier of a document: the last segment of its logical path.
pub fn doc_id_of(logical: &str) -> DocId {
    let name = logical.rsplit('/').next().unwrap_or(logical);
    DocId::new(name)
}

/// Category prefix of a logical path (its directory part).
pub fn category_of(logical: &str) -> &str {
    logical.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Strip surrounding slashes so `"/a/b/"` and `"a/b"` name the same scope.
pub fn normalize_scope(scope: &str) -> &str {
    scope.trim().trim_matches('/')
}

/// Whether `scope` contains `candidate`, comparing whole path segments.
///
/// ```
/// use notegraph_core::utils::scope_covers;
///
/// assert!(scope_covers("", "anything"));
/// assert!(scope_covers("lang", "lang/rust"));
/// assert!(!scope_covers("lang", "language"));
/// ```
pub fn scope_covers(scope: &str, candidate: &str) -> bool {
    let scope = normalize_scope(scope);
    if scope.is_empty() {
        return true;
    }
    candidate == scope
        || (candidate.starts_with(scope) && candidate[scope.len()..].starts_with('/'))
}

pub fn compute_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_and_category() {
        assert_eq!(doc_id_of("a/b/Note"), DocId::new("Note"));
        assert_eq!(doc_id_of("Note"), DocId::new("Note"));
        assert_eq!(category_of("a/b/Note"), "a/b");
        assert_eq!(category_of("Note"), "");
    }

    #[test]
    fn test_scope_covers_segments() {
        assert!(scope_covers("/lang/", "lang"));
        assert!(scope_covers("lang", "lang/rust/traits"));
        assert!(!scope_covers("lang/rust", "lang"));
        assert!(!scope_covers("lang", ""));
    }

    #[test]
    fn test_digest() {
        assert_eq!(compute_digest("Content A"), compute_digest("Content A"));
        assert_ne!(compute_digest("Content A"), compute_digest("Content B"));
        assert_eq!(compute_digest("x").len(), 64); // SHA256 hex string length
    }
}
