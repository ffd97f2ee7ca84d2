//! CLI Folder Commands

use std::sync::Arc;

use anyhow::Result;

use richdoc_core::{DocumentStore, FolderId};

pub async fn create(store: Arc<dyn DocumentStore>, name: &str, parent: Option<i64>) -> Result<()> {
    let id = store.create_folder(name, parent.map(FolderId)).await?;
    println!("Created folder '{}' with id {}", name, id);
    Ok(())
}

pub async fn list(store: Arc<dyn DocumentStore>) -> Result<()> {
    let folders = store.list_folders().await?;
    if folders.is_empty() {
        println!("No folders. Create one with `richdoc folder create <name>`.");
        return Ok(());
    }
    println!("{:<8} {:<8} NAME", "ID", "PARENT");
    for folder in folders {
        let parent = folder.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        println!("{:<8} {:<8} {}", folder.id, parent, folder.name);
    }
    Ok(())
}
