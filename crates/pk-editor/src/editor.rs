//! The [`Editor`] facade.
//!
//! Owns the scene and every piece of editor state (history, background,
//! cached workspace size). Hosts only change the design through these
//! methods, which keeps history and background bookkeeping consistent with
//! the scene. Capabilities (image loading, QR rendering, rasterizing, file
//! output) are borrowed per call.
//!
//! The async methods that render QR codes (`add_qr_code`,
//! `update_dynamic_qr_codes`, `export_data_pdf`) need a tokio runtime with
//! time enabled. Image loading alone runs on any executor.

use crate::background::{
    BackgroundController, BackgroundInfo, BackgroundListener, BackgroundState,
};
use crate::config::{EditorConfig, TextOptions};
use crate::dynamic;
use crate::error::{EditorError, EditorResult};
use crate::export::{
    DataExportRequest, ExportFormat, ExportOutcome, SaveOptions, export_data_pdf, export_page,
};
use crate::history::{History, HistoryEntry, SaveCallback};
use crate::services::{FileSink, ImageLoader, QrRenderer};
use kurbo::{Affine, Point, Rect, Size};
use pk_core::data_source::DataSources;
use pk_core::document::Document;
use pk_core::error::SnapshotError;
use pk_core::id::ObjectId;
use pk_core::model::{Binding, ObjectKind, SceneObject, ShapeKind};
use pk_core::scene::Scene;
use pk_core::snapshot::SceneSnapshot;
use pk_render::raster::Rasterizer;
use pk_render::vector::import_svg;
use serde_json::Value;

/// Side length of newly added shapes.
const SHAPE_SIZE: f64 = 400.0;

/// Share of the container the page fills after [`Editor::auto_zoom`].
const FIT_RATIO: f64 = 0.85;
const ZOOM_STEP: f64 = 0.05;
const MIN_ZOOM: f64 = 0.2;
const MAX_ZOOM: f64 = 1.0;

pub struct Editor {
    config: EditorConfig,
    scene: Scene,
    history: History,
    background: BackgroundController,
    /// Last known workspace size, used while the workspace object is
    /// missing or has no size.
    workspace_dimensions: (f64, f64),
    /// Size of the host's drawing surface, known once `auto_zoom` ran.
    container: Option<Size>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("objects", &self.scene.len())
            .field("history", &self.history)
            .field("background", &self.background)
            .field("workspace_dimensions", &self.workspace_dimensions)
            .field("container", &self.container)
            .finish()
    }
}

impl Editor {
    /// An empty design: just the workspace. History entry 0 is this state.
    pub fn new(config: EditorConfig) -> EditorResult<Self> {
        let (w, h) = (config.default_width, config.default_height);
        let mut scene = Scene::with_workspace(w, h, &config.workspace_fill);
        scene.take_modified();
        let history = History::new(HistoryEntry::capture(&scene, w, h)?, config.history_limit);
        log::info!("editor: new {w}x{h} design");
        Ok(Self {
            config,
            scene,
            history,
            background: BackgroundController::new(),
            workspace_dimensions: (w, h),
            container: None,
        })
    }

    /// Open a saved design. History starts at the loaded state.
    pub async fn from_document<L: ImageLoader>(
        config: EditorConfig,
        json: &str,
        loader: &L,
    ) -> EditorResult<Self> {
        let mut editor = Self::new(config)?;
        editor.apply_document(json, loader).await?;
        let (w, h) = editor.page_size();
        editor
            .history
            .reset(HistoryEntry::capture(&editor.scene, w, h)?);
        Ok(editor)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn workspace_dimensions(&self) -> (f64, f64) {
        self.workspace_dimensions
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Register the persistence callback invoked on every history save.
    pub fn set_save_callback(&mut self, callback: Option<SaveCallback>) {
        self.history.set_save_callback(callback);
    }

    /// Record the current scene. Returns `false` while saves are suspended.
    pub fn save(&mut self) -> EditorResult<bool> {
        let (w, h) = self.page_size();
        let saved = self.history.save(&self.scene, w, h)?;
        if saved {
            self.scene.take_modified();
        }
        Ok(saved)
    }

    /// Save if the scene changed since the last save.
    fn commit(&mut self) -> EditorResult<bool> {
        if !self.scene.is_modified() || self.history.is_suspended() {
            return Ok(false);
        }
        self.save()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one entry. Returns `Ok(false)` when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> EditorResult<bool> {
        match self.history.undo_target() {
            Some(target) => self.replay(target),
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        match self.history.redo_target() {
            Some(target) => self.replay(target),
            None => Ok(false),
        }
    }

    /// Load history entry `target` into the scene.
    ///
    /// A corrupt entry leaves the cursor in place and the scene at the
    /// current entry (or entry 0 if that cannot be read either).
    fn replay(&mut self, target: usize) -> EditorResult<bool> {
        let _guard = self.history.suspend();
        let Some(entry) = self.history.entry(target).cloned() else {
            return Ok(false);
        };
        match self.apply_entry(&entry) {
            Ok(()) => {
                self.history.set_index(target);
                self.background.sync_from_scene(&mut self.scene);
                log::debug!("history: moved to entry {target}");
                Ok(true)
            }
            Err(err) => {
                log::warn!("history: entry {target} is corrupt: {err}");
                let current = self.history.current().clone();
                if let Err(fallback) = self.apply_entry(&current) {
                    log::warn!("history: current entry unreadable, reverting to entry 0: {fallback}");
                    if let Some(first) = self.history.entry(0).cloned() {
                        self.apply_entry(&first)?;
                        self.history.set_index(0);
                    }
                }
                self.background.sync_from_scene(&mut self.scene);
                Err(EditorError::SnapshotCorrupt(err))
            }
        }
    }

    fn apply_entry(&mut self, entry: &HistoryEntry) -> Result<(), SnapshotError> {
        let snapshot = SceneSnapshot::from_json(&entry.json)?;
        self.scene.load_snapshot(&snapshot)?;
        if entry.width > 0.0 && entry.height > 0.0 {
            self.workspace_dimensions = (entry.width, entry.height);
        }
        Ok(())
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn to_document(&self) -> Document {
        let (w, h) = self.page_size();
        Document::capture(&self.scene, w, h)
    }

    pub fn to_json(&self) -> EditorResult<String> {
        Ok(self.to_document().to_json()?)
    }

    /// Write the design as `<export name>.json`.
    pub fn save_json<S: FileSink>(&self, sink: &mut S) -> EditorResult<String> {
        let json = self.to_json()?;
        let name = format!("{}.json", self.config.export_file_name);
        sink.save(json.as_bytes(), &name)?;
        Ok(name)
    }

    /// Replace the design with a saved document and record it in history.
    ///
    /// A document that cannot be parsed leaves the current design intact.
    pub async fn load_json<L: ImageLoader>(&mut self, json: &str, loader: &L) -> EditorResult<()> {
        self.apply_document(json, loader).await?;
        self.scene.mark_modified();
        self.commit()?;
        Ok(())
    }

    async fn apply_document<L: ImageLoader>(&mut self, json: &str, loader: &L) -> EditorResult<()> {
        let doc = Document::parse(json)?;
        let _guard = self.history.suspend();
        self.scene.load_snapshot(&doc.objects)?;
        self.rehydrate_qr_codes();

        let (w, h) = doc
            .dimensions()
            .or_else(|| {
                self.scene
                    .workspace()
                    .map(SceneObject::natural_size)
                    .filter(|(w, h)| *w > 0.0 && *h > 0.0)
            })
            .unwrap_or((self.config.default_width, self.config.default_height));
        self.workspace_dimensions = (w, h);
        if self.scene.workspace().is_none() {
            self.scene
                .insert_at(0, SceneObject::workspace(w, h, &self.config.workspace_fill));
        }

        let page = self.page_region();
        if let Err(err) = self
            .background
            .restore(&mut self.scene, page, &doc.background_image_state, loader)
            .await
        {
            log::warn!("editor: loaded without background: {err}");
        }
        self.scene.take_modified();
        self.refit();
        log::info!(
            "editor: loaded {} objects ({} dynamic), {w}x{h}",
            self.scene.len(),
            self.scene.dynamic_count()
        );
        Ok(())
    }

    /// Rebuild vector paths for QR codes saved with only their markup.
    fn rehydrate_qr_codes(&mut self) {
        let ids = self.scene.query(|o| {
            matches!(&o.kind, ObjectKind::QrCode { paths, svg, .. } if paths.is_empty() && !svg.is_empty())
        });
        for id in ids {
            let Some(obj) = self.scene.get_mut(id) else {
                continue;
            };
            let (old_w, old_h) = obj.scaled_size();
            let ObjectKind::QrCode {
                svg,
                paths,
                width,
                height,
                ..
            } = &mut obj.kind
            else {
                continue;
            };
            match import_svg(svg) {
                Ok(imported) if imported.width > 0.0 && imported.height > 0.0 => {
                    *paths = imported.paths;
                    *width = imported.width;
                    *height = imported.height;
                    obj.transform.scale_x = old_w / imported.width;
                    obj.transform.scale_y = old_h / imported.height;
                }
                Ok(_) => log::warn!("editor: qr {id} markup has no size"),
                Err(err) => log::warn!("editor: qr {id} markup unreadable: {err}"),
            }
        }
    }

    // ─── Background ──────────────────────────────────────────────────────

    pub async fn set_background_image<L: ImageLoader>(
        &mut self,
        url: &str,
        locked: bool,
        loader: &L,
    ) -> EditorResult<()> {
        let page = self.page_region();
        let result = self
            .background
            .set(&mut self.scene, page, url, locked, loader)
            .await;
        self.commit()?;
        result
    }

    /// Returns `false` when there is no background to lock.
    pub fn set_background_image_lock(&mut self, locked: bool) -> EditorResult<bool> {
        let changed = self.background.set_locked(&mut self.scene, locked);
        self.commit()?;
        Ok(changed)
    }

    pub fn remove_background_image(&mut self) -> EditorResult<bool> {
        let removed = self.background.remove(&mut self.scene);
        self.commit()?;
        Ok(removed)
    }

    pub fn background_image_info(&self) -> BackgroundInfo {
        self.background.info()
    }

    pub fn background_state(&self) -> BackgroundState {
        self.background.state()
    }

    /// Register the background listener, replacing any previous one.
    pub fn set_background_state_change_listener(&mut self, listener: Option<BackgroundListener>) {
        self.background.set_listener(listener);
    }

    // ─── Page ────────────────────────────────────────────────────────────

    pub fn get_workspace(&self) -> Option<&SceneObject> {
        self.scene.workspace()
    }

    /// Workspace size, falling back to the cached size and then to the
    /// configured default.
    pub fn page_size(&self) -> (f64, f64) {
        let live = self
            .scene
            .workspace()
            .map(SceneObject::natural_size)
            .filter(|(w, h)| *w > 0.0 && *h > 0.0);
        let cached = Some(self.workspace_dimensions).filter(|(w, h)| *w > 0.0 && *h > 0.0);
        live.or(cached)
            .unwrap_or((self.config.default_width, self.config.default_height))
    }

    /// Page bounds in scene coordinates.
    pub fn page_region(&self) -> Rect {
        let (left, top) = self
            .scene
            .workspace()
            .map_or((0.0, 0.0), |ws| (ws.transform.left, ws.transform.top));
        let (w, h) = self.page_size();
        Rect::new(left, top, left + w, top + h)
    }

    pub fn generate_save_options(&self) -> SaveOptions {
        let region = self.page_region();
        SaveOptions {
            name: "Image".to_string(),
            format: ExportFormat::Png,
            quality: 1.0,
            width: region.width(),
            height: region.height(),
            left: region.x0,
            top: region.y0,
        }
    }

    /// Resize the page. The background is refitted.
    pub fn change_size(&mut self, width: f64, height: f64) -> EditorResult<()> {
        if width <= 0.0 || height <= 0.0 {
            log::warn!("editor: ignoring page size {width}x{height}");
            return Ok(());
        }
        if let Some(ws) = self.scene.workspace_mut() {
            if let ObjectKind::Workspace {
                width: w,
                height: h,
                ..
            } = &mut ws.kind
            {
                *w = width;
                *h = height;
            }
        }
        self.workspace_dimensions = (width, height);
        self.scene.mark_modified();
        let page = self.page_region();
        self.background.resize(&mut self.scene, page);
        self.refit();
        self.commit()?;
        Ok(())
    }

    /// Set the page fill color.
    pub fn change_background(&mut self, fill: &str) -> EditorResult<()> {
        if let Some(ws) = self.scene.workspace_mut() {
            if let ObjectKind::Workspace { fill: f, .. } = &mut ws.kind {
                *f = fill.to_string();
            }
            self.scene.mark_modified();
        }
        self.commit()?;
        Ok(())
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Current zoom factor of the viewport.
    pub fn zoom(&self) -> f64 {
        self.scene.viewport().as_coeffs()[0]
    }

    /// Fit the page into a `container` of the given size and center it.
    /// The size is remembered for later zoom steps and page resizes.
    pub fn auto_zoom(&mut self, container: Size) {
        if container.width <= 0.0 || container.height <= 0.0 {
            log::warn!(
                "editor: ignoring container size {}x{}",
                container.width,
                container.height
            );
            return;
        }
        self.container = Some(container);
        self.refit();
    }

    fn refit(&mut self) {
        let Some(container) = self.container else {
            return;
        };
        let page = self.page_region();
        let fit = (container.width / page.width()).min(container.height / page.height());
        let zoom = FIT_RATIO * fit;
        let screen_center = Point::new(container.width / 2.0, container.height / 2.0);
        let offset = screen_center.to_vec2() - page.center().to_vec2() * zoom;
        self.scene
            .set_viewport(Affine::translate(offset) * Affine::scale(zoom));
        log::debug!("editor: fitted page at zoom {zoom:.3}");
    }

    /// Zoom in one step about the container center, up to 100%.
    pub fn zoom_in(&mut self) {
        self.zoom_to((self.zoom() + ZOOM_STEP).min(MAX_ZOOM));
    }

    /// Zoom out one step about the container center, down to 20%.
    pub fn zoom_out(&mut self) {
        self.zoom_to((self.zoom() - ZOOM_STEP).max(MIN_ZOOM));
    }

    /// Set the zoom factor keeping the container center fixed on screen.
    fn zoom_to(&mut self, zoom: f64) {
        let (w, h) = self
            .container
            .map_or_else(|| self.page_size(), |c| (c.width, c.height));
        let anchor = Point::new(w / 2.0, h / 2.0);
        let viewport = self.scene.viewport();
        let under_anchor = viewport.inverse() * anchor;
        self.scene.set_viewport(
            Affine::translate(anchor.to_vec2())
                * Affine::scale(zoom)
                * Affine::translate(-under_anchor.to_vec2()),
        );
    }

    // ─── Dynamic content ─────────────────────────────────────────────────

    /// Add a text box; bound to a data field when `binding` is set.
    pub fn add_text(
        &mut self,
        value: &str,
        options: Option<&TextOptions>,
        binding: Option<Binding>,
    ) -> EditorResult<ObjectId> {
        let options = options.unwrap_or(&self.config.text);
        let id = dynamic::add_text(&mut self.scene, options, value, binding);
        self.commit()?;
        Ok(id)
    }

    pub async fn add_qr_code<Q: QrRenderer>(
        &mut self,
        url: &str,
        binding: Option<Binding>,
        data: Option<&Value>,
        renderer: &Q,
    ) -> EditorResult<ObjectId> {
        let id =
            dynamic::add_qr_code(&mut self.scene, &self.config, renderer, url, binding, data)
                .await?;
        self.commit()?;
        Ok(id)
    }

    pub fn update_dynamic_text(
        &mut self,
        data_source_id: &str,
        field_path: &str,
        item_index: usize,
        data: &Value,
    ) -> EditorResult<usize> {
        let n = dynamic::update_dynamic_text(
            &mut self.scene,
            data_source_id,
            field_path,
            item_index,
            data,
        );
        self.commit()?;
        Ok(n)
    }

    pub async fn update_dynamic_qr_codes<Q: QrRenderer>(
        &mut self,
        data_source_id: &str,
        field_path: &str,
        item_index: usize,
        data: &Value,
        renderer: &Q,
    ) -> EditorResult<usize> {
        let n = dynamic::update_dynamic_qr_codes(
            &mut self.scene,
            &self.config,
            renderer,
            data_source_id,
            field_path,
            item_index,
            data,
        )
        .await;
        self.commit()?;
        Ok(n)
    }

    // ─── Content ─────────────────────────────────────────────────────────

    /// Add an image of known natural size, centered and selected.
    pub fn add_image(&mut self, src: &str, width: f64, height: f64) -> EditorResult<ObjectId> {
        let obj = SceneObject::new(ObjectKind::Image {
            src: src.to_string(),
            width,
            height,
        });
        self.place(obj)
    }

    pub fn add_shape(&mut self, shape: ShapeKind) -> EditorResult<ObjectId> {
        let obj = SceneObject::new(ObjectKind::Shape {
            shape,
            width: SHAPE_SIZE,
            height: SHAPE_SIZE,
            fill: "rgba(0,0,0,1)".to_string(),
            stroke: None,
            stroke_width: 0.0,
        });
        self.place(obj)
    }

    fn place(&mut self, obj: SceneObject) -> EditorResult<ObjectId> {
        let id = self.scene.add(obj);
        self.scene.center_object(id);
        self.scene.select(id);
        self.commit()?;
        Ok(id)
    }

    /// Make `id` the only selected object. Locked objects refuse.
    pub fn select(&mut self, id: ObjectId) -> bool {
        self.scene.clear_selection();
        self.scene.select(id)
    }

    pub fn selection(&self) -> &[ObjectId] {
        self.scene.selection()
    }

    /// Delete every selected object. Returns how many were removed.
    pub fn delete_selected(&mut self) -> EditorResult<usize> {
        let ids = self.scene.selection().to_vec();
        let mut removed = 0;
        let mut background_removed = false;
        for id in ids {
            if let Some((_, obj)) = self.scene.remove(id) {
                background_removed |= obj.is_background();
                removed += 1;
            }
        }
        if background_removed {
            self.background.sync_from_scene(&mut self.scene);
        }
        self.commit()?;
        Ok(removed)
    }

    pub fn move_object(&mut self, id: ObjectId, dx: f64, dy: f64) -> EditorResult<bool> {
        let moved = self.scene.translate_object(id, dx, dy);
        self.commit()?;
        Ok(moved)
    }

    pub fn scale_object(&mut self, id: ObjectId, fx: f64, fy: f64) -> EditorResult<bool> {
        let scaled = self.scene.scale_object(id, fx, fy);
        self.commit()?;
        Ok(scaled)
    }

    /// Index of the lowest slot ordinary content may occupy.
    fn content_floor(&self) -> usize {
        self.scene
            .objects()
            .iter()
            .rposition(|o| o.is_workspace() || o.is_background())
            .map_or(0, |i| i + 1)
    }

    pub fn bring_forward(&mut self, id: ObjectId) -> EditorResult<bool> {
        let is_content = self
            .scene
            .get(id)
            .is_some_and(|o| !o.is_workspace() && !o.is_background());
        let moved = is_content && self.scene.bring_forward(id);
        self.commit()?;
        Ok(moved)
    }

    /// Move one step back, never below the background.
    pub fn send_backwards(&mut self, id: ObjectId) -> EditorResult<bool> {
        let floor = self.content_floor();
        let movable = self.scene.index_of(id).is_some_and(|pos| pos > floor);
        let moved = movable && self.scene.send_backwards(id);
        self.commit()?;
        Ok(moved)
    }

    // ─── Export ──────────────────────────────────────────────────────────

    fn export_single<R: Rasterizer, S: FileSink>(
        &mut self,
        format: ExportFormat,
        include_background: bool,
        rasterizer: &R,
        sink: &mut S,
    ) -> EditorResult<String> {
        let _guard = self.history.suspend();
        let region = self.generate_save_options().region();
        let bytes = export_page(
            &mut self.scene,
            region,
            format,
            include_background,
            self.config.jpeg_quality,
            rasterizer,
        )?;
        let name = format!("{}.{}", self.config.export_file_name, format.extension());
        sink.save(&bytes, &name)?;
        Ok(name)
    }

    pub fn save_png<R: Rasterizer, S: FileSink>(
        &mut self,
        include_background: bool,
        rasterizer: &R,
        sink: &mut S,
    ) -> EditorResult<String> {
        self.export_single(ExportFormat::Png, include_background, rasterizer, sink)
    }

    pub fn save_jpg<R: Rasterizer, S: FileSink>(
        &mut self,
        include_background: bool,
        rasterizer: &R,
        sink: &mut S,
    ) -> EditorResult<String> {
        self.export_single(ExportFormat::Jpg, include_background, rasterizer, sink)
    }

    pub fn save_svg<R: Rasterizer, S: FileSink>(
        &mut self,
        include_background: bool,
        rasterizer: &R,
        sink: &mut S,
    ) -> EditorResult<String> {
        self.export_single(ExportFormat::Svg, include_background, rasterizer, sink)
    }

    pub fn save_pdf<R: Rasterizer, S: FileSink>(
        &mut self,
        include_background: bool,
        rasterizer: &R,
        sink: &mut S,
    ) -> EditorResult<String> {
        self.export_single(ExportFormat::Pdf, include_background, rasterizer, sink)
    }

    /// One PDF page per item of a data source array. Nothing is written if
    /// any page fails.
    pub async fn export_data_pdf<Q: QrRenderer, R: Rasterizer, S: FileSink>(
        &mut self,
        request: &DataExportRequest,
        sources: &DataSources,
        renderer: &Q,
        rasterizer: &R,
        sink: &mut S,
    ) -> EditorResult<ExportOutcome> {
        let _guard = self.history.suspend();
        let region = self.page_region();
        let (outcome, bytes) = export_data_pdf(
            &mut self.scene,
            &self.config,
            region,
            request,
            sources,
            renderer,
            rasterizer,
        )
        .await?;
        let base = request
            .file_name
            .as_deref()
            .unwrap_or(&self.config.export_file_name);
        sink.save(&bytes, &format!("{base}.pdf"))?;
        Ok(outcome)
    }
}
