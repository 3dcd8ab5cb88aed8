// File utilities for the IPDraft PDF engine

use anyhow::Result;
use std::path::Path;
use tokio::fs;

/// Ensure the parent directory of `path` exists, creating it if necessary.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Get file size in bytes.
pub async fn get_file_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).await?;
    Ok(metadata.len())
}

/// Best-effort removal of a partially written artifact. Failures are
/// ignored; the caller has already hit the error that matters.
pub async fn remove_file_best_effort(path: &Path) {
    let _ = fs::remove_file(path).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_ensure_parent_dir() {
        let temp_dir = tempdir().unwrap();
        let nested = temp_dir.path().join("a/b/out.pdf");

        assert!(!nested.parent().unwrap().exists());
        ensure_parent_dir(&nested).await.unwrap();
        assert!(nested.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_get_file_size() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("sample.bin");
        fs::write(&path, b"12345").await.unwrap();
        assert_eq!(get_file_size(&path).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_remove_file_best_effort_is_silent_on_missing() {
        let temp_dir = tempdir().unwrap();
        remove_file_best_effort(&temp_dir.path().join("missing.pdf")).await;
    }
}
