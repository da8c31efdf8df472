//! Retained-mode scene: an ordered object list with selection, viewport,
//! z-order control and snapshot/restore.
//!
//! Index 0 is the back-most object. The workspace always stays at the back;
//! z-order operations never move anything below it.

use crate::error::SnapshotError;
use crate::id::ObjectId;
use crate::model::{ObjectKind, SceneObject};
use crate::snapshot::{ObjectSnapshot, SceneSnapshot};
use kurbo::{Affine, Rect};
use smallvec::SmallVec;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Scene {
    objects: Vec<SceneObject>,
    selection: SmallVec<[ObjectId; 4]>,
    viewport: Affine,
    modified: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            selection: SmallVec::new(),
            viewport: Affine::IDENTITY,
            modified: false,
        }
    }

    /// A scene holding only a workspace of the given size.
    pub fn with_workspace(width: f64, height: f64, fill: &str) -> Self {
        let mut scene = Self::new();
        scene.objects.push(SceneObject::workspace(width, height, fill));
        scene
    }

    // ─── Objects ─────────────────────────────────────────────────────────

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Add an object on top of everything else.
    pub fn add(&mut self, obj: SceneObject) -> ObjectId {
        let id = obj.id;
        self.objects.push(obj);
        self.modified = true;
        id
    }

    /// Insert at a z-index, clamped to the list length.
    pub fn insert_at(&mut self, index: usize, obj: SceneObject) -> ObjectId {
        let id = obj.id;
        let index = index.min(self.objects.len());
        self.objects.insert(index, obj);
        self.modified = true;
        id
    }

    /// Remove an object, returning its former z-index and value.
    pub fn remove(&mut self, id: ObjectId) -> Option<(usize, SceneObject)> {
        let index = self.index_of(id)?;
        let obj = self.objects.remove(index);
        self.selection.retain(|s| *s != id);
        self.modified = true;
        Some((index, obj))
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Mutable access. Callers that change visible state should follow up
    /// with [`Scene::mark_modified`].
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn find(&self, pred: impl Fn(&SceneObject) -> bool) -> Option<&SceneObject> {
        self.objects.iter().find(|o| pred(o))
    }

    /// Ids of all objects matching `pred`, back to front.
    pub fn query(&self, pred: impl Fn(&SceneObject) -> bool) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| pred(o))
            .map(|o| o.id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.selection.clear();
        self.modified = true;
    }

    /// Swap in a whole object list, returning the previous one.
    pub fn replace_objects(&mut self, objects: Vec<SceneObject>) -> Vec<SceneObject> {
        self.selection
            .retain(|id| objects.iter().any(|o| o.id == *id));
        self.modified = true;
        std::mem::replace(&mut self.objects, objects)
    }

    // ─── Workspace & background ──────────────────────────────────────────

    pub fn workspace(&self) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.is_workspace())
    }

    pub fn workspace_mut(&mut self) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.is_workspace())
    }

    /// Workspace rectangle in scene coordinates.
    pub fn workspace_bounds(&self) -> Option<Rect> {
        let ws = self.workspace()?;
        let (w, h) = ws.scaled_size();
        let t = ws.transform;
        Some(Rect::new(t.left, t.top, t.left + w, t.top + h))
    }

    pub fn background(&self) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.is_background())
    }

    pub fn background_mut(&mut self) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.is_background())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    /// Replace the selection with a single object. Refused for objects
    /// that are missing or not selectable.
    pub fn select(&mut self, id: ObjectId) -> bool {
        match self.get(id) {
            Some(obj) if obj.flags.selectable && obj.visible => {
                self.selection.clear();
                self.selection.push(id);
                true
            }
            _ => false,
        }
    }

    pub fn deselect(&mut self, id: ObjectId) {
        self.selection.retain(|s| *s != id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn viewport(&self) -> Affine {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Affine) {
        self.viewport = viewport;
    }

    pub fn reset_viewport(&mut self) {
        self.viewport = Affine::IDENTITY;
    }

    /// Move an object so its center sits on the workspace center.
    pub fn center_object(&mut self, id: ObjectId) -> bool {
        let Some(bounds) = self.workspace_bounds() else {
            return false;
        };
        let center = bounds.center();
        let Some(obj) = self.get_mut(id) else {
            return false;
        };
        let (w, h) = obj.scaled_size();
        obj.transform.left = center.x - w / 2.0;
        obj.transform.top = center.y - h / 2.0;
        self.modified = true;
        true
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    fn floor(&self) -> usize {
        match self.objects.first() {
            Some(first) if first.is_workspace() => 1,
            _ => 0,
        }
    }

    fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from == to {
            return false;
        }
        let obj = self.objects.remove(from);
        self.objects.insert(to, obj);
        self.modified = true;
        true
    }

    /// Move one step toward the front. Returns true if the order changed.
    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        let floor = self.floor();
        match self.index_of(id) {
            Some(pos) if pos >= floor && pos + 1 < self.objects.len() => {
                self.reorder(pos, pos + 1)
            }
            _ => false,
        }
    }

    /// Move one step toward the back, never below the workspace.
    pub fn send_backwards(&mut self, id: ObjectId) -> bool {
        let floor = self.floor();
        match self.index_of(id) {
            Some(pos) if pos > floor => self.reorder(pos, pos - 1),
            _ => false,
        }
    }

    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let floor = self.floor();
        let last = self.objects.len().saturating_sub(1);
        match self.index_of(id) {
            Some(pos) if pos >= floor => self.reorder(pos, last),
            _ => false,
        }
    }

    /// Move to the back, directly above the workspace.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let floor = self.floor();
        match self.index_of(id) {
            Some(pos) if pos > floor => self.reorder(pos, floor),
            _ => false,
        }
    }

    // ─── Lock-respecting mutations ───────────────────────────────────────

    /// Translate an object, skipping locked axes.
    pub fn translate_object(&mut self, id: ObjectId, dx: f64, dy: f64) -> bool {
        let Some(obj) = self.get_mut(id) else {
            return false;
        };
        let mut changed = false;
        if !obj.flags.lock_movement_x && dx != 0.0 {
            obj.transform.left += dx;
            changed = true;
        }
        if !obj.flags.lock_movement_y && dy != 0.0 {
            obj.transform.top += dy;
            changed = true;
        }
        self.modified |= changed;
        changed
    }

    /// Multiply an object's scale, skipping locked axes.
    pub fn scale_object(&mut self, id: ObjectId, fx: f64, fy: f64) -> bool {
        let Some(obj) = self.get_mut(id) else {
            return false;
        };
        let mut changed = false;
        if !obj.flags.lock_scaling_x && fx != 1.0 {
            obj.transform.scale_x *= fx;
            changed = true;
        }
        if !obj.flags.lock_scaling_y && fy != 1.0 {
            obj.transform.scale_y *= fy;
            changed = true;
        }
        self.modified |= changed;
        changed
    }

    pub fn rotate_object(&mut self, id: ObjectId, degrees: f64) -> bool {
        let Some(obj) = self.get_mut(id) else {
            return false;
        };
        if obj.flags.lock_rotation || degrees == 0.0 {
            return false;
        }
        obj.transform.angle = (obj.transform.angle + degrees).rem_euclid(360.0);
        self.modified = true;
        true
    }

    // ─── Change tracking ─────────────────────────────────────────────────

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Read and reset the modified flag.
    pub fn take_modified(&mut self) -> bool {
        std::mem::take(&mut self.modified)
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    pub fn to_snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::new(self.objects.iter().map(ObjectSnapshot::from).collect())
    }

    /// Replace scene contents with a snapshot. The scene is untouched if
    /// any object fails to convert.
    pub fn load_snapshot(&mut self, snapshot: &SceneSnapshot) -> Result<(), SnapshotError> {
        let mut objects = snapshot
            .objects
            .iter()
            .cloned()
            .map(SceneObject::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        for obj in &objects {
            ObjectId::reserve(obj.id);
        }
        let mut seen = HashSet::with_capacity(objects.len());
        for obj in &mut objects {
            if !seen.insert(obj.id) {
                let fresh = ObjectId::with_prefix(obj.kind.id_prefix());
                log::warn!("scene: duplicate id {} renamed to {fresh}", obj.id);
                obj.id = fresh;
            }
        }
        log::debug!("scene: loaded snapshot with {} objects", objects.len());
        self.objects = objects;
        self.selection.clear();
        self.modified = false;
        Ok(())
    }

    /// Number of data-bound objects.
    pub fn dynamic_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_dynamic()).count()
    }

    /// Natural size of the background image, if one is placed.
    pub fn background_natural_size(&self) -> Option<(f64, f64)> {
        match &self.background()?.kind {
            ObjectKind::BackgroundImage { width, height, .. } => Some((*width, *height)),
            _ => None,
        }
    }
}
