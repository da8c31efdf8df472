//! Page background image.
//!
//! At most one background object exists per scene. It sits directly above
//! the workspace and below all other content, is fitted to the page, and
//! can be locked against selection and geometry changes. Every transition
//! is reported to a single registered listener.

use crate::error::{EditorError, EditorResult};
use crate::services::ImageLoader;
use kurbo::Rect;
use pk_core::document::BackgroundImageState;
use pk_core::model::{ObjectFlags, ObjectKind, SceneObject, Transform};
use pk_core::scene::Scene;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundState {
    Absent,
    Unlocked,
    Locked,
}

/// What listeners and the UI see of the background.
///
/// `width`/`height` are the natural image size, `0` when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundInfo {
    pub background_image_url: Option<String>,
    pub is_locked: bool,
    pub width: f64,
    pub height: f64,
}

impl BackgroundInfo {
    fn absent() -> Self {
        Self {
            background_image_url: None,
            is_locked: false,
            width: 0.0,
            height: 0.0,
        }
    }

    fn of(scene: &Scene) -> Self {
        match scene.background().map(|o| &o.kind) {
            Some(ObjectKind::BackgroundImage {
                image_url,
                width,
                height,
                locked,
            }) => Self {
                background_image_url: Some(image_url.clone()),
                is_locked: *locked,
                width: *width,
                height: *height,
            },
            _ => Self::absent(),
        }
    }
}

pub type BackgroundListener = Box<dyn FnMut(&BackgroundInfo)>;

/// Uniform scale that fits `(w, h)` to the page width, or to the page
/// height when the width fit would overflow vertically.
fn fit_scale(w: f64, h: f64, page: Rect) -> f64 {
    let scale = page.width() / w;
    if h * scale > page.height() {
        page.height() / h
    } else {
        scale
    }
}

fn apply_lock(obj: &mut SceneObject, locked: bool) {
    obj.flags = if locked {
        ObjectFlags::locked()
    } else {
        ObjectFlags::default()
    };
    if let ObjectKind::BackgroundImage { locked: l, .. } = &mut obj.kind {
        *l = locked;
    }
}

/// Per-editor background state machine.
#[derive(Default)]
pub struct BackgroundController {
    current: Option<BackgroundInfo>,
    listener: Option<BackgroundListener>,
}

impl std::fmt::Debug for BackgroundController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundController")
            .field("current", &self.current)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl BackgroundController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BackgroundState {
        match &self.current {
            None => BackgroundState::Absent,
            Some(info) if info.is_locked => BackgroundState::Locked,
            Some(_) => BackgroundState::Unlocked,
        }
    }

    pub fn info(&self) -> BackgroundInfo {
        self.current.clone().unwrap_or_else(BackgroundInfo::absent)
    }

    /// Register the listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: Option<BackgroundListener>) {
        self.listener = listener;
    }

    fn notify(&mut self) {
        let info = self.info();
        log::debug!(
            "background: {:?} url={:?}",
            self.state(),
            info.background_image_url
        );
        if let Some(listener) = self.listener.as_mut() {
            listener(&info);
        }
    }

    /// Re-read state from the scene (after undo/redo or a document load).
    pub fn sync_from_scene(&mut self, scene: &mut Scene) {
        if let Some(bg) = scene.background_mut() {
            let locked = matches!(bg.kind, ObjectKind::BackgroundImage { locked: true, .. });
            apply_lock(bg, locked);
        }
        self.current = scene.background().map(|_| BackgroundInfo::of(scene));
        self.notify();
    }

    /// Replace the background with the image at `url`, fitted to `page`.
    ///
    /// Any existing background is removed first. If the image fails to
    /// load the scene is left without a background.
    pub async fn set<L: ImageLoader>(
        &mut self,
        scene: &mut Scene,
        page: Rect,
        url: &str,
        locked: bool,
        loader: &L,
    ) -> EditorResult<()> {
        Self::detach(scene);

        let image = match loader.load(url).await {
            Ok(image) if image.width > 0.0 && image.height > 0.0 => image,
            Ok(image) => {
                self.current = None;
                self.notify();
                return Err(EditorError::asset(format!(
                    "background {url} has empty size {}x{}",
                    image.width, image.height
                )));
            }
            Err(err) => {
                log::warn!("background: failed to load {url}: {err}");
                self.current = None;
                self.notify();
                return Err(EditorError::asset(format!("background {url}: {err}")));
            }
        };

        let scale = fit_scale(image.width, image.height, page);
        let mut obj = SceneObject::new(ObjectKind::BackgroundImage {
            image_url: url.to_string(),
            width: image.width,
            height: image.height,
            locked,
        });
        obj.transform = Transform {
            left: page.x0,
            top: page.y0,
            scale_x: scale,
            scale_y: scale,
            angle: 0.0,
        };
        apply_lock(&mut obj, locked);
        scene.insert_at(Self::slot(scene), obj);

        self.current = Some(BackgroundInfo::of(scene));
        self.notify();
        Ok(())
    }

    /// Toggle the lock. No-op without a background.
    pub fn set_locked(&mut self, scene: &mut Scene, locked: bool) -> bool {
        let Some(bg) = scene.background_mut() else {
            return false;
        };
        let id = bg.id;
        apply_lock(bg, locked);
        if locked && scene.is_selected(id) {
            scene.deselect(id);
        }
        scene.mark_modified();
        self.current = Some(BackgroundInfo::of(scene));
        self.notify();
        true
    }

    /// Remove the background object and clear all state.
    pub fn remove(&mut self, scene: &mut Scene) -> bool {
        let removed = Self::detach(scene);
        self.current = None;
        self.notify();
        removed
    }

    /// Refit after a page resize: uniform scale by the smaller of the two
    /// page ratios, placed at the page origin.
    pub fn resize(&mut self, scene: &mut Scene, page: Rect) -> bool {
        let Some(bg) = scene.background_mut() else {
            return false;
        };
        let (w, h) = bg.natural_size();
        if w <= 0.0 || h <= 0.0 {
            return false;
        }
        let scale = (page.width() / w).min(page.height() / h);
        bg.transform.left = page.x0;
        bg.transform.top = page.y0;
        bg.transform.scale_x = scale;
        bg.transform.scale_y = scale;
        scene.mark_modified();
        self.current = Some(BackgroundInfo::of(scene));
        self.notify();
        true
    }

    /// Bring the scene in line with a persisted background state.
    ///
    /// The image is fetched again; if that fails the background is dropped
    /// and the rest of the document stays loaded.
    pub async fn restore<L: ImageLoader>(
        &mut self,
        scene: &mut Scene,
        page: Rect,
        saved: &BackgroundImageState,
        loader: &L,
    ) -> EditorResult<()> {
        let placed = BackgroundInfo::of(scene).background_image_url;
        let recorded = saved
            .image_url
            .clone()
            .filter(|_| saved.has_background_image);

        match (placed, recorded) {
            (None, None) => {
                self.sync_from_scene(scene);
                Ok(())
            }
            (None, Some(url)) => {
                self.set(scene, page, &url, saved.is_locked, loader).await?;
                if let (Some(dims), Some(bg)) = (saved.dimensions, scene.background_mut()) {
                    bg.transform = Transform {
                        left: dims.left,
                        top: dims.top,
                        scale_x: dims.scale_x,
                        scale_y: dims.scale_y,
                        angle: 0.0,
                    };
                }
                self.sync_from_scene(scene);
                Ok(())
            }
            (Some(url), _) => match loader.load(&url).await {
                Ok(_) => {
                    if saved.has_background_image {
                        if let Some(bg) = scene.background_mut() {
                            apply_lock(bg, saved.is_locked);
                        }
                    }
                    self.sync_from_scene(scene);
                    Ok(())
                }
                Err(err) => {
                    log::warn!("background: failed to restore {url}: {err}");
                    self.remove(scene);
                    Err(EditorError::asset(format!("background {url}: {err}")))
                }
            },
        }
    }

    /// Z-index directly above the workspace.
    fn slot(scene: &Scene) -> usize {
        scene
            .objects()
            .iter()
            .position(|o| o.is_workspace())
            .map_or(0, |i| i + 1)
    }

    fn detach(scene: &mut Scene) -> bool {
        let ids = scene.query(|o| o.is_background());
        let removed = !ids.is_empty();
        for id in ids {
            scene.remove(id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::LoadedImage;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedLoader(f64, f64);

    impl ImageLoader for FixedLoader {
        async fn load(&self, url: &str) -> Result<LoadedImage, String> {
            if url.contains("broken") {
                return Err("404".into());
            }
            Ok(LoadedImage {
                width: self.0,
                height: self.1,
            })
        }
    }

    fn page() -> Rect {
        Rect::new(0.0, 0.0, 800.0, 600.0)
    }

    #[test]
    fn fit_prefers_width() {
        assert_eq!(fit_scale(1600.0, 1000.0, page()), 0.5);
        // Width fit would be 1000 tall; fall back to height.
        assert_eq!(fit_scale(800.0, 1000.0, page()), 0.6);
    }

    #[tokio::test]
    async fn set_places_above_workspace() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        scene.add(SceneObject::new(ObjectKind::Image {
            src: "logo.png".into(),
            width: 10.0,
            height: 10.0,
        }));
        let mut bg = BackgroundController::new();
        bg.set(&mut scene, page(), "a.png", false, &FixedLoader(1600.0, 1000.0))
            .await
            .unwrap();
        assert!(scene.objects()[1].is_background());
        let t = scene.objects()[1].transform;
        assert_eq!((t.left, t.top, t.scale_x, t.scale_y), (0.0, 0.0, 0.5, 0.5));
        assert_eq!(bg.state(), BackgroundState::Unlocked);
    }

    #[tokio::test]
    async fn failed_load_leaves_absent() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let mut bg = BackgroundController::new();
        bg.set(&mut scene, page(), "a.png", true, &FixedLoader(10.0, 10.0))
            .await
            .unwrap();
        let err = bg
            .set(&mut scene, page(), "broken.png", true, &FixedLoader(10.0, 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::AssetFailure(_)));
        assert!(scene.background().is_none());
        assert_eq!(bg.state(), BackgroundState::Absent);
    }

    #[tokio::test]
    async fn listener_is_last_wins() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let mut bg = BackgroundController::new();
        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(Vec::new()));

        let f = Rc::clone(&first);
        bg.set_listener(Some(Box::new(move |_: &BackgroundInfo| {
            *f.borrow_mut() += 1
        })));
        let s = Rc::clone(&second);
        bg.set_listener(Some(Box::new(move |info: &BackgroundInfo| {
            s.borrow_mut().push(info.clone())
        })));

        bg.set(&mut scene, page(), "a.png", false, &FixedLoader(400.0, 300.0))
            .await
            .unwrap();
        bg.set_locked(&mut scene, true);
        bg.remove(&mut scene);

        assert_eq!(*first.borrow(), 0);
        let seen = second.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].background_image_url.as_deref(), Some("a.png"));
        assert_eq!((seen[0].width, seen[0].height), (400.0, 300.0));
        assert!(seen[1].is_locked);
        assert_eq!(seen[2], BackgroundInfo::absent());
    }

    #[test]
    fn lock_without_background_is_noop() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let mut bg = BackgroundController::new();
        assert!(!bg.set_locked(&mut scene, true));
        assert_eq!(bg.state(), BackgroundState::Absent);
    }

    #[tokio::test]
    async fn resize_uses_smaller_ratio() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let mut bg = BackgroundController::new();
        bg.set(&mut scene, page(), "a.png", false, &FixedLoader(1000.0, 1000.0))
            .await
            .unwrap();
        assert!(bg.resize(&mut scene, Rect::new(0.0, 0.0, 500.0, 300.0)));
        let t = scene.background().unwrap().transform;
        assert_eq!((t.scale_x, t.scale_y), (0.3, 0.3));
    }
}
