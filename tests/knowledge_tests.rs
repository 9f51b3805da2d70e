// Integration tests for the file-backed knowledge store.
//
// The knowledge blob is persisted outside the session and read exactly
// once at connect time; a missing file must read as empty context.

use anyhow::Result;
use tempfile::TempDir;
use voicelink::knowledge::{FileKnowledgeStore, KnowledgeStore};

#[tokio::test]
async fn test_set_then_get_round_trips() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("knowledge.txt");

    let store = FileKnowledgeStore::new(&path);
    store.set("Q3 revenue was $4.2M").await?;

    assert_eq!(store.get().await, "Q3 revenue was $4.2M");
    Ok(())
}

#[tokio::test]
async fn test_missing_file_reads_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileKnowledgeStore::new(temp_dir.path().join("absent.txt"));

    assert_eq!(store.get().await, "");
}

#[tokio::test]
async fn test_set_creates_parent_directories() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("nested").join("deep").join("notes.txt");

    let store = FileKnowledgeStore::new(&path);
    store.set("context").await?;

    assert!(path.exists());
    assert_eq!(store.get().await, "context");
    Ok(())
}

#[tokio::test]
async fn test_set_replaces_previous_text() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileKnowledgeStore::new(temp_dir.path().join("knowledge.txt"));

    store.set("old notes").await?;
    store.set("new notes").await?;

    assert_eq!(store.get().await, "new notes");
    Ok(())
}
