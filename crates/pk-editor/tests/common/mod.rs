//! Fake capabilities shared by the editor integration tests.

#![allow(dead_code)]

use image::RgbaImage;
use kurbo::Rect;
use pk_core::model::ObjectKind;
use pk_core::scene::Scene;
use pk_editor::services::{ImageLoader, LoadedImage, QrRenderer};
use pk_render::{RenderError, Rasterizer};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serves fixed image sizes by URL; unknown URLs fail.
#[derive(Default)]
pub struct FakeLoader {
    sizes: HashMap<String, (f64, f64)>,
    pub calls: Cell<usize>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, width: f64, height: f64) -> Self {
        self.sizes.insert(url.to_string(), (width, height));
        self
    }
}

impl ImageLoader for FakeLoader {
    async fn load(&self, url: &str) -> Result<LoadedImage, String> {
        self.calls.set(self.calls.get() + 1);
        self.sizes
            .get(url)
            .map(|&(width, height)| LoadedImage { width, height })
            .ok_or_else(|| format!("404 {url}"))
    }
}

/// Renders every payload as a 21×21 module grid with one finder square.
/// Payloads containing `"broken"` fail.
#[derive(Default)]
pub struct FakeQr {
    pub rendered: RefCell<Vec<String>>,
}

impl QrRenderer for FakeQr {
    async fn render(&self, payload: &str) -> Result<String, String> {
        self.rendered.borrow_mut().push(payload.to_string());
        if payload.contains("broken") {
            return Err(format!("cannot encode {payload:?}"));
        }
        Ok(r##"<svg xmlns="http://www.w3.org/2000/svg" width="21" height="21"><path d="M0 0h7v7H0z" fill="#000000"/><path d="M14 14h7v7h-7z" fill="#000000"/></svg>"##.to_string())
    }
}

/// What one capture saw.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub texts: Vec<String>,
    pub qr_payloads: Vec<String>,
    pub has_background: bool,
    pub workspace_visible: bool,
    pub region: (f64, f64),
}

/// Rasterizer that records visible content instead of drawing it.
#[derive(Default)]
pub struct RecordingRasterizer {
    pub captures: RefCell<Vec<Capture>>,
    /// Fail on this capture number (0-based).
    pub fail_on: Option<usize>,
}

impl Rasterizer for RecordingRasterizer {
    fn rasterize(
        &self,
        scene: &Scene,
        region: Rect,
        _background: Option<&str>,
    ) -> Result<RgbaImage, RenderError> {
        let n = self.captures.borrow().len();
        if self.fail_on == Some(n) {
            return Err(RenderError::Pixmap { width: 0, height: 0 });
        }
        let visible = scene.objects().iter().filter(|o| o.visible);
        let mut texts = Vec::new();
        let mut qr_payloads = Vec::new();
        for obj in visible {
            match &obj.kind {
                ObjectKind::Text { text, .. } => texts.push(text.clone()),
                ObjectKind::QrCode { payload, .. } => qr_payloads.push(payload.clone()),
                _ => {}
            }
        }
        self.captures.borrow_mut().push(Capture {
            texts,
            qr_payloads,
            has_background: scene.background().is_some(),
            workspace_visible: scene.workspace().is_some_and(|w| w.visible),
            region: (region.width(), region.height()),
        });
        Ok(RgbaImage::new(
            region.width().ceil() as u32,
            region.height().ceil() as u32,
        ))
    }
}
