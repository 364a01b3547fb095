use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Supplies an optional decorative attachment for outgoing messages.
pub trait AttachmentSource: Send + Sync {
    fn pick(&self) -> Option<PathBuf>;
}

/// Random image from a directory listed once at startup, so picking never
/// touches the filesystem.
#[derive(Debug, Clone, Default)]
pub struct ImageDirectory {
    images: Vec<PathBuf>,
}

impl ImageDirectory {
    /// Lists the images in `dir`. A missing or unreadable directory yields an
    /// empty set and a warning.
    pub async fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match list_images(&dir).await {
            Ok(images) => {
                info!("{} decorative image(s) in {}", images.len(), dir.display());
                Self { images }
            }
            Err(e) => {
                warn!("Cannot read image directory {}: {}", dir.display(), e);
                Self::default()
            }
        }
    }
}

impl AttachmentSource for ImageDirectory {
    fn pick(&self) -> Option<PathBuf> {
        self.images.choose(&mut rand::thread_rng()).cloned()
    }
}

async fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file && is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
