//! Document store: markdown pages grouped per organization.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use canonic_shared::{CanonicError, Result};

/// Known documents, addressed by `/`-separated relative path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document path known for `org`, sorted.
    async fn list_paths(&self, org: &str) -> Result<Vec<String>>;

    /// Raw text of one document, `None` if it does not exist.
    async fn read(&self, org: &str, path: &str) -> Result<Option<String>>;
}

/// Markdown files under `<root>/<org>/`.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn org_dir(&self, org: &str) -> Result<PathBuf> {
        check_relative(org)?;
        Ok(self.root.join(org))
    }
}

/// Refuse absolute paths and parent-directory escapes.
fn check_relative(path: &str) -> Result<()> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(CanonicError::validation(format!(
            "document path '{path}' must be relative and stay inside the store"
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn list_paths(&self, org: &str) -> Result<Vec<String>> {
        let dir = self.org_dir(org)?;
        if !dir.is_dir() {
            debug!(?dir, "no documents for organization");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                CanonicError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_markdown = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
            if !is_markdown {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&dir) {
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                paths.push(parts.join("/"));
            }
        }

        paths.sort();
        Ok(paths)
    }

    async fn read(&self, org: &str, path: &str) -> Result<Option<String>> {
        check_relative(path)?;
        let full = self.org_dir(org)?.join(path);
        match std::fs::read_to_string(&full) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CanonicError::io(full, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[&str]) -> (tempfile::TempDir, FsDocumentStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        for file in files {
            let path = dir.path().join("acme").join(file);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(&path, format!("# {file}")).expect("write");
        }
        let store = FsDocumentStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn lists_markdown_recursively() {
        let (_dir, store) = store_with(&["hr/leave_policy.md", "company.md", "logo.png"]);
        let paths = store.list_paths("acme").await.expect("list");
        assert_eq!(paths, vec!["company.md", "hr/leave_policy.md"]);
    }

    #[tokio::test]
    async fn unknown_org_is_empty() {
        let (_dir, store) = store_with(&["company.md"]);
        assert!(store.list_paths("globex").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn read_existing_and_missing() {
        let (_dir, store) = store_with(&["hr/leave_policy.md"]);
        let text = store.read("acme", "hr/leave_policy.md").await.expect("read");
        assert_eq!(text.as_deref(), Some("# hr/leave_policy.md"));
        assert!(store.read("acme", "hr/nope.md").await.expect("read").is_none());
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let (_dir, store) = store_with(&["company.md"]);
        assert!(store.read("acme", "../secrets.md").await.is_err());
        assert!(store.list_paths("../acme").await.is_err());
    }
}
