//! Capabilities the editor borrows from its host.
//!
//! Each is passed into the operation that needs it, so an editor never
//! holds a global loader, renderer or file system handle.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

/// Natural pixel size of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedImage {
    pub width: f64,
    pub height: f64,
}

/// Fetches and decodes images by URL.
pub trait ImageLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<LoadedImage, String>>;
}

/// Renders a payload as QR-code SVG markup.
///
/// Every render is bounded by [`crate::EditorConfig::qr_timeout`] through
/// `tokio::time`, so callers must poll QR operations inside a tokio runtime
/// with the time driver enabled.
pub trait QrRenderer {
    fn render(&self, payload: &str) -> impl Future<Output = Result<String, String>>;
}

/// Persists exported bytes under a suggested file name.
pub trait FileSink {
    fn save(&mut self, bytes: &[u8], file_name: &str) -> io::Result<()>;
}

// ─── Local implementations ───────────────────────────────────────────────

/// Resolves image URLs as paths below a root directory and reads only the
/// image header.
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    root: PathBuf,
}

impl FileImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<LoadedImage, String>> {
        let path = self.root.join(url.trim_start_matches("file://"));
        async move {
            let (w, h) = image::image_dimensions(&path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            Ok(LoadedImage {
                width: f64::from(w),
                height: f64::from(h),
            })
        }
    }
}

/// Writes files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn save(&mut self, bytes: &[u8], file_name: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        log::info!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Keeps saved files in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently saved file.
    pub fn last(&self) -> Option<(&str, &[u8])> {
        self.files
            .last()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }
}

impl FileSink for MemorySink {
    fn save(&mut self, bytes: &[u8], file_name: &str) -> io::Result<()> {
        self.files.push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}
