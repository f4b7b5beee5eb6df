use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::rag::{KnowledgeError, UploadStore};

/// Disk-backed store for uploaded PDFs. Files live flat in one directory;
/// names are sanitized to their basename so a crafted filename cannot
/// escape it.
pub struct DiskUploadStore {
    dir: PathBuf,
}

impl DiskUploadStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let basename = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        self.dir.join(basename)
    }
}

#[async_trait]
impl UploadStore for DiskUploadStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<(), KnowledgeError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| KnowledgeError::Upload(e.to_string()))?;

        fs::write(self.path_for(name), bytes)
            .await
            .map_err(|e| KnowledgeError::Upload(e.to_string()))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, KnowledgeError> {
        fs::read(self.path_for(name))
            .await
            .map_err(|e| KnowledgeError::Upload(format!("{name}: {e}")))
    }

    async fn list(&self) -> Result<Vec<String>, KnowledgeError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| KnowledgeError::Upload(e.to_string()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| KnowledgeError::Upload(e.to_string()))?
        {
            if entry
                .file_type()
                .await
                .map_err(|e| KnowledgeError::Upload(e.to_string()))?
                .is_file()
            {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_read_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskUploadStore::new(dir.path());

        store.save("catalog.pdf", b"%PDF-1.4").await.unwrap();
        store.save("guide.pdf", b"%PDF-1.4 two").await.unwrap();

        assert_eq!(store.read("catalog.pdf").await.unwrap(), b"%PDF-1.4");
        assert_eq!(
            store.list().await.unwrap(),
            vec!["catalog.pdf".to_string(), "guide.pdf".to_string()]
        );
    }

    #[tokio::test]
    async fn test_list_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskUploadStore::new(dir.path().join("never-created"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskUploadStore::new(dir.path());

        store.save("../../evil.pdf", b"x").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["evil.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_read_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskUploadStore::new(dir.path());
        assert!(store.read("nope.pdf").await.is_err());
    }
}
