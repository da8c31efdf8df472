//! Export pipeline.
//!
//! Capturing a page temporarily changes the live scene: the background may
//! be detached, the viewport is reset and the workspace rectangle is
//! hidden. [`ExportSession`] applies those changes and undoes them in
//! reverse order when dropped, so every exit path (including `?`) leaves
//! the scene as it was.

use crate::config::EditorConfig;
use crate::dynamic::{update_dynamic_qr_codes, update_dynamic_text};
use crate::encode::{encode_jpeg, encode_png};
use crate::error::{EditorError, EditorResult};
use crate::pdf::PdfDocument;
use crate::services::QrRenderer;
use kurbo::{Affine, Rect};
use pk_core::data_source::{DataSources, array_len_at_path, find_first_array_path};
use pk_core::id::ObjectId;
use pk_core::model::{Binding, ObjectKind, SceneObject};
use pk_core::scene::Scene;
use pk_render::raster::Rasterizer;
use pk_render::svg::render_svg;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpg,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

/// Capture parameters for the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOptions {
    pub name: String,
    pub format: ExportFormat,
    pub quality: f64,
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl SaveOptions {
    pub fn region(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }
}

// ─── Session ─────────────────────────────────────────────────────────────

/// Scoped export mutation of a scene. Restores on drop.
pub struct ExportSession<'a> {
    scene: &'a mut Scene,
    viewport: Affine,
    background: Option<(usize, SceneObject)>,
    hidden_workspace: Option<ObjectId>,
    objects: Option<Vec<SceneObject>>,
    was_modified: bool,
}

impl<'a> ExportSession<'a> {
    pub fn begin(scene: &'a mut Scene, include_background: bool) -> Self {
        let was_modified = scene.is_modified();
        let viewport = scene.viewport();

        let background = match scene.background().map(|bg| bg.id) {
            Some(id) if !include_background => scene.remove(id),
            _ => None,
        };

        scene.reset_viewport();

        let hidden_workspace = match scene.workspace_mut() {
            Some(ws) if ws.visible => {
                ws.visible = false;
                Some(ws.id)
            }
            _ => None,
        };

        log::trace!(
            "export: staged (background detached: {}, workspace hidden: {})",
            background.is_some(),
            hidden_workspace.is_some()
        );
        Self {
            scene,
            viewport,
            background,
            hidden_workspace,
            objects: None,
            was_modified,
        }
    }

    /// Remember the current object list so per-page rebinds are undone
    /// when the session ends.
    pub fn preserve_objects(&mut self) {
        self.objects = Some(self.scene.objects().to_vec());
    }

    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }

    /// Workspace fill, painted beneath the capture in place of the hidden
    /// workspace rectangle.
    pub fn page_fill(&self) -> Option<String> {
        match self.scene.workspace().map(|ws| &ws.kind) {
            Some(ObjectKind::Workspace { fill, .. }) => Some(fill.clone()),
            _ => None,
        }
    }

    pub fn rasterize<R: Rasterizer>(
        &self,
        rasterizer: &R,
        region: Rect,
    ) -> EditorResult<image::RgbaImage> {
        let fill = self.page_fill();
        Ok(rasterizer.rasterize(&*self.scene, region, fill.as_deref())?)
    }
}

impl Drop for ExportSession<'_> {
    fn drop(&mut self) {
        if let Some(objects) = self.objects.take() {
            self.scene.replace_objects(objects);
        }
        if let Some(id) = self.hidden_workspace {
            if let Some(ws) = self.scene.get_mut(id) {
                ws.visible = true;
            }
        }
        if let Some((index, bg)) = self.background.take() {
            self.scene.insert_at(index, bg);
        }
        self.scene.set_viewport(self.viewport);
        if !self.was_modified {
            self.scene.take_modified();
        }
        log::trace!("export: restored scene");
    }
}

// ─── Single page ─────────────────────────────────────────────────────────

/// Capture `region` and encode it as `format`.
pub fn export_page<R: Rasterizer>(
    scene: &mut Scene,
    region: Rect,
    format: ExportFormat,
    include_background: bool,
    jpeg_quality: u8,
    rasterizer: &R,
) -> EditorResult<Vec<u8>> {
    let session = ExportSession::begin(scene, include_background);
    let bytes = match format {
        ExportFormat::Svg => {
            let fill = session.page_fill();
            render_svg(&*session.scene, region, fill.as_deref()).into_bytes()
        }
        ExportFormat::Png => encode_png(&session.rasterize(rasterizer, region)?)?,
        ExportFormat::Jpg => encode_jpeg(&session.rasterize(rasterizer, region)?, jpeg_quality)?,
        ExportFormat::Pdf => {
            let img = session.rasterize(rasterizer, region)?;
            let mut doc = PdfDocument::new(region.width(), region.height());
            doc.add_page(&img);
            doc.finish()
        }
    };
    log::info!(
        "export: {} page {}x{} ({} bytes)",
        format.extension(),
        region.width(),
        region.height(),
        bytes.len()
    );
    Ok(bytes)
}

// ─── Data-bound multi-page PDF ───────────────────────────────────────────

/// Which array items become pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageRange {
    All,
    /// Inclusive on both ends; `end` is clamped to the last item.
    Range { start: usize, end: usize },
}

impl PageRange {
    /// Item indices to emit for an array of `len` items, or `None` if the
    /// range selects nothing.
    pub fn indices(self, len: usize) -> Option<RangeInclusive<usize>> {
        let last = len.checked_sub(1)?;
        let (start, end) = match self {
            Self::All => (0, last),
            Self::Range { start, end } => (start, end.min(last)),
        };
        (start <= end).then_some(start..=end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExportRequest {
    pub data_source_id: String,
    /// Dotted path to the item array; the first array in the data when
    /// unset.
    #[serde(default)]
    pub data_path: Option<String>,
    pub range: PageRange,
    /// Base file name; the configured export name when unset.
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default = "default_true")]
    pub include_background: bool,
}

fn default_true() -> bool {
    true
}

impl DataExportRequest {
    pub fn new(data_source_id: &str, range: PageRange) -> Self {
        Self {
            data_source_id: data_source_id.to_string(),
            data_path: None,
            range,
            file_name: None,
            include_background: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// One page per selected item.
    Pages(usize),
    /// No usable item array; the current page was exported as is.
    SinglePage,
}

/// Distinct bound field paths of `source_id` on nodes matching `pred`.
fn bound_paths(
    scene: &Scene,
    source_id: &str,
    pred: impl Fn(&SceneObject) -> bool,
) -> BTreeSet<String> {
    scene
        .objects()
        .iter()
        .filter(|o| pred(o))
        .filter_map(|o| o.binding())
        .filter(|b| b.data_source_id == source_id)
        .map(Binding::canonical_path)
        .collect()
}

/// Render one PDF page per selected item of a data source's array.
///
/// Falls back to a single-page PDF of the current scene when the source,
/// its array or the selected range is missing or empty.
pub async fn export_data_pdf<Q: QrRenderer, R: Rasterizer>(
    scene: &mut Scene,
    config: &EditorConfig,
    region: Rect,
    request: &DataExportRequest,
    sources: &DataSources,
    qr: &Q,
    rasterizer: &R,
) -> EditorResult<(ExportOutcome, Vec<u8>)> {
    let source_id = request.data_source_id.as_str();
    let pages = sources.data(source_id).and_then(|data| {
        let path = request
            .data_path
            .clone()
            .or_else(|| find_first_array_path(data))?;
        let len = array_len_at_path(data, &path)?;
        request.range.indices(len)
    });
    let (Some(data), Some(pages)) = (sources.data(source_id), pages) else {
        log::warn!("export: no item array in {source_id:?}, exporting a single page");
        let bytes = export_page(
            scene,
            region,
            ExportFormat::Pdf,
            request.include_background,
            config.jpeg_quality,
            rasterizer,
        )?;
        return Ok((ExportOutcome::SinglePage, bytes));
    };

    let mut session = ExportSession::begin(scene, request.include_background);
    session.preserve_objects();
    let text_paths = bound_paths(&*session.scene, source_id, SceneObject::is_text);
    let qr_paths = bound_paths(&*session.scene, source_id, SceneObject::is_qr_code);

    let mut doc = PdfDocument::new(region.width(), region.height());
    for index in pages {
        for path in &text_paths {
            update_dynamic_text(session.scene(), source_id, path, index, data);
        }
        for path in &qr_paths {
            update_dynamic_qr_codes(session.scene(), config, qr, source_id, path, index, data)
                .await;
        }
        let img = session.rasterize(rasterizer, region)?;
        doc.add_page(&img);
        log::debug!("export: page for item {index}");
    }
    drop(session);

    let count = doc.page_count();
    if count == 0 {
        return Err(EditorError::export("no pages rendered"));
    }
    log::info!("export: {count}-page pdf from {source_id:?}");
    Ok((ExportOutcome::Pages(count), doc.finish()))
}
