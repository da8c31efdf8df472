//! Linear undo/redo history over full scene snapshots.
//!
//! Entries form a flat sequence with a cursor. Saving after an undo drops
//! every entry past the cursor. Entry 0 is the state captured when the
//! editor was created and is never corrupt.

use pk_core::error::SnapshotError;
use pk_core::scene::Scene;
use std::cell::Cell;
use std::rc::Rc;

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Serialized `SceneSnapshot`.
    pub json: String,
    pub width: f64,
    pub height: f64,
}

impl HistoryEntry {
    pub fn capture(scene: &Scene, width: f64, height: f64) -> Result<Self, SnapshotError> {
        Ok(Self {
            json: scene.to_snapshot().to_json()?,
            width,
            height,
        })
    }
}

/// Callback receiving every saved entry, e.g. for autosave.
pub type SaveCallback = Box<dyn FnMut(&HistoryEntry)>;

/// Suppresses history saves while alive.
///
/// Guards nest; saves resume once every guard has been dropped.
#[must_use = "saves resume as soon as the guard is dropped"]
pub struct SuspendGuard {
    depth: Rc<Cell<u32>>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
    limit: Option<usize>,
    suspended: Rc<Cell<u32>>,
    on_save: Option<SaveCallback>,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("len", &self.entries.len())
            .field("index", &self.index)
            .field("limit", &self.limit)
            .field("suspended", &self.suspended.get())
            .finish()
    }
}

impl History {
    /// Start a history whose entry 0 is `initial`.
    pub fn new(initial: HistoryEntry, limit: Option<usize>) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            limit: limit.map(|l| l.max(1)),
            suspended: Rc::new(Cell::new(0)),
            on_save: None,
        }
    }

    pub fn set_save_callback(&mut self, callback: Option<SaveCallback>) {
        self.on_save = callback;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn entry(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    /// Index undo would move to.
    pub fn undo_target(&self) -> Option<usize> {
        self.can_undo().then(|| self.index - 1)
    }

    /// Index redo would move to.
    pub fn redo_target(&self) -> Option<usize> {
        self.can_redo().then(|| self.index + 1)
    }

    /// Move the cursor. Out-of-range indices are ignored.
    pub fn set_index(&mut self, index: usize) {
        if index < self.entries.len() {
            self.index = index;
        }
    }

    /// Suppress saves until the returned guard is dropped.
    pub fn suspend(&self) -> SuspendGuard {
        self.suspended.set(self.suspended.get() + 1);
        SuspendGuard {
            depth: Rc::clone(&self.suspended),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.get() > 0
    }

    /// Capture `scene` as a new entry. Returns `Ok(false)` without
    /// recording anything while suspended.
    pub fn save(&mut self, scene: &Scene, width: f64, height: f64) -> Result<bool, SnapshotError> {
        if self.is_suspended() {
            log::trace!("history: save suppressed");
            return Ok(false);
        }
        let entry = HistoryEntry::capture(scene, width, height)?;
        log::debug!(
            "history: save #{} ({} objects, {} dynamic)",
            self.index + 1,
            scene.len(),
            scene.dynamic_count()
        );
        self.push_entry(entry);
        Ok(true)
    }

    /// Append an entry after the cursor, discarding any redo tail.
    pub fn push_entry(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
            }
        }
        self.index = self.entries.len() - 1;
        if let Some(callback) = self.on_save.as_mut() {
            callback(&self.entries[self.index]);
        }
    }

    /// Drop everything and start over from `initial`.
    pub fn reset(&mut self, initial: HistoryEntry) {
        self.entries.clear();
        self.entries.push(initial);
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_core::model::{ObjectKind, SceneObject, ShapeKind};
    use std::cell::RefCell;

    fn entry(tag: &str) -> HistoryEntry {
        HistoryEntry {
            json: tag.to_string(),
            width: 100.0,
            height: 100.0,
        }
    }

    fn tags(h: &History) -> Vec<String> {
        (0..h.len()).map(|i| h.entry(i).unwrap().json.clone()).collect()
    }

    #[test]
    fn cursor_bounds() {
        let mut h = History::new(entry("a"), None);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        h.push_entry(entry("b"));
        assert!(h.can_undo());
        assert_eq!(h.undo_target(), Some(0));
        assert_eq!(h.redo_target(), None);
    }

    #[test]
    fn push_after_undo_truncates() {
        let mut h = History::new(entry("a"), None);
        h.push_entry(entry("b"));
        h.push_entry(entry("c"));
        h.set_index(0);
        assert!(h.can_redo());
        h.push_entry(entry("d"));
        assert_eq!(tags(&h), vec!["a", "d"]);
        assert!(!h.can_redo());
        assert_eq!(h.index(), 1);
    }

    #[test]
    fn limit_drops_oldest() {
        let mut h = History::new(entry("a"), Some(2));
        h.push_entry(entry("b"));
        h.push_entry(entry("c"));
        assert_eq!(tags(&h), vec!["b", "c"]);
        assert_eq!(h.index(), 1);
    }

    #[test]
    fn suspension_nests() {
        let mut scene = Scene::with_workspace(10.0, 10.0, "white");
        let mut h = History::new(HistoryEntry::capture(&scene, 10.0, 10.0).unwrap(), None);
        let outer = h.suspend();
        let inner = h.suspend();
        scene.add(SceneObject::new(ObjectKind::Shape {
            shape: ShapeKind::Ellipse,
            width: 1.0,
            height: 1.0,
            fill: "red".into(),
            stroke: None,
            stroke_width: 0.0,
        }));
        assert!(!h.save(&scene, 10.0, 10.0).unwrap());
        drop(inner);
        assert!(h.is_suspended());
        drop(outer);
        assert!(h.save(&scene, 10.0, 10.0).unwrap());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn callback_sees_each_save() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut h = History::new(entry("a"), None);
        h.set_save_callback(Some(Box::new(move |e: &HistoryEntry| {
            sink.borrow_mut().push((e.json.clone(), e.width, e.height));
        })));
        h.push_entry(entry("b"));
        assert_eq!(*seen.borrow(), vec![("b".to_string(), 100.0, 100.0)]);
    }
}
