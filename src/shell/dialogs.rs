use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileFilter {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Native file pickers. `None` means the user cancelled.
#[async_trait]
pub trait FileDialogs: Send + Sync {
    async fn pick_directory(&self, title: Option<String>) -> Option<PathBuf>;

    async fn pick_file(&self, title: Option<String>, filters: Vec<FileFilter>) -> Option<PathBuf>;
}

/// Dialogs shown through the desktop's native picker
pub struct NativeDialogs;

#[async_trait]
impl FileDialogs for NativeDialogs {
    async fn pick_directory(&self, title: Option<String>) -> Option<PathBuf> {
        let title = title.unwrap_or_else(|| "Select Game Directory".to_string());
        tokio::task::spawn_blocking(move || rfd::FileDialog::new().set_title(title).pick_folder())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Directory dialog failed: {}", e);
                None
            })
    }

    async fn pick_file(&self, title: Option<String>, filters: Vec<FileFilter>) -> Option<PathBuf> {
        let title = title.unwrap_or_else(|| "Select File".to_string());
        tokio::task::spawn_blocking(move || {
            let mut dialog = rfd::FileDialog::new().set_title(title);
            for filter in filters {
                // "*" means any file, which is what the picker shows without a filter
                let extensions: Vec<String> = filter
                    .extensions
                    .into_iter()
                    .filter(|ext| ext != "*")
                    .collect();
                if !extensions.is_empty() {
                    dialog = dialog.add_filter(filter.name, extensions.as_slice());
                }
            }
            dialog.pick_file()
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("File dialog failed: {}", e);
            None
        })
    }
}
