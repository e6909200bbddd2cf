//! Selected tire image and its preview handle.
//!
//! A [`PreviewHandle`] is released when dropped. [`ImageAsset`] drops the
//! previous handle before asking the provider for a new one, so at most one
//! preview is live per asset.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const PREVIEW_URL_PREFIX: &str = "blob:tire-preview/";

#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads an image from disk, guessing the content type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = content_type_for(path);
        Ok(Self::new(name, content_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Source of preview URLs for selected images.
pub trait PreviewProvider: Send + Sync + fmt::Debug {
    fn create(&self, file: &ImageFile) -> String;
    fn release(&self, url: &str);
}

/// A live preview URL; releases itself on drop.
pub struct PreviewHandle {
    url: String,
    provider: Arc<dyn PreviewProvider>,
}

impl PreviewHandle {
    pub fn create(provider: Arc<dyn PreviewProvider>, file: &ImageFile) -> Self {
        let url = provider.create(file);
        debug!(url = %url, "Preview handle created");
        Self { url, provider }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.provider.release(&self.url);
        debug!(url = %self.url, "Preview handle released");
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("url", &self.url)
            .finish()
    }
}

/// In-process object URL table, standing in for the browser's blob URLs.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    live: HashMap<String, ImageFile>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, url: &str) -> Option<ImageFile> {
        self.lock().live.get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Preview registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl PreviewProvider for ObjectUrlRegistry {
    fn create(&self, file: &ImageFile) -> String {
        let mut inner = self.lock();
        inner.next_id += 1;
        let url = format!("{PREVIEW_URL_PREFIX}{}", inner.next_id);
        inner.live.insert(url.clone(), file.clone());
        url
    }

    fn release(&self, url: &str) {
        if self.lock().live.remove(url).is_none() {
            warn!(url = %url, "Released unknown preview url");
        }
    }
}

#[derive(Debug)]
pub struct ImageAsset {
    file: Option<ImageFile>,
    preview: Option<PreviewHandle>,
    provider: Arc<dyn PreviewProvider>,
}

impl ImageAsset {
    pub fn new(provider: Arc<dyn PreviewProvider>) -> Self {
        Self {
            file: None,
            preview: None,
            provider,
        }
    }

    pub fn select(&mut self, file: ImageFile) {
        if let Some(previous) = self.preview.take() {
            previous.release();
        }
        self.preview = Some(PreviewHandle::create(Arc::clone(&self.provider), &file));
        self.file = Some(file);
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.preview.take() {
            previous.release();
        }
        self.file = None;
    }

    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview.as_ref().map(PreviewHandle::url)
    }
}
