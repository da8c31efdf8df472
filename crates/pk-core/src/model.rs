//! Scene object model for PosterKit documents.
//!
//! A scene is a flat, z-ordered list of `SceneObject` values. Each object
//! carries a transform, interaction flags, and a tagged `ObjectKind`. Data
//! binding fields only exist on the kinds that can be bound (text and QR
//! codes), so a binding check is a pattern match rather than a property
//! lookup.

use crate::id::ObjectId;
use crate::path::FieldPath;
use serde::{Deserialize, Serialize};

/// Reserved name of the workspace (page bounds) object.
pub const WORKSPACE_NAME: &str = "clip";

/// Design-time page size used when no workspace geometry is known.
pub const DEFAULT_WIDTH: f64 = 1200.0;
pub const DEFAULT_HEIGHT: f64 = 900.0;

/// Text line height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.16;

// ─── Geometry ────────────────────────────────────────────────────────────

/// Object placement. `left`/`top` is the unrotated top-left corner;
/// rotation (`angle`, degrees) pivots around that corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub angle: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
        }
    }
}

impl Transform {
    pub fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            ..Self::default()
        }
    }
}

/// Interaction flags. Locks only gate user-facing scene mutations
/// (`Scene::translate_object` and friends); programmatic placement ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFlags {
    pub selectable: bool,
    pub evented: bool,
    pub has_controls: bool,
    pub lock_movement_x: bool,
    pub lock_movement_y: bool,
    pub lock_scaling_x: bool,
    pub lock_scaling_y: bool,
    pub lock_rotation: bool,
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
            has_controls: true,
            lock_movement_x: false,
            lock_movement_y: false,
            lock_scaling_x: false,
            lock_scaling_y: false,
            lock_rotation: false,
        }
    }
}

impl ObjectFlags {
    /// Fully locked: not selectable, not movable, not resizable.
    pub fn locked() -> Self {
        Self {
            selectable: false,
            evented: false,
            has_controls: false,
            lock_movement_x: true,
            lock_movement_y: true,
            lock_scaling_x: true,
            lock_scaling_y: true,
            lock_rotation: true,
        }
    }

    /// Layout aid that can never be picked (the workspace).
    pub fn inert() -> Self {
        Self {
            selectable: false,
            has_controls: false,
            ..Self::default()
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_movement_x && self.lock_movement_y && self.lock_scaling_x && self.lock_scaling_y
    }
}

// ─── Binding ─────────────────────────────────────────────────────────────

/// Association of a node with a data-source field.
///
/// `field_path` is kept exactly as written so documents save back
/// unchanged. Literal `[n]` indices in it are informational; `item_index`
/// selects the array element at every array step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub data_source_id: String,
    pub field_path: String,
    pub item_index: usize,
}

impl Binding {
    pub fn new(data_source_id: &str, field_path: &str, item_index: usize) -> Self {
        Self {
            data_source_id: data_source_id.to_string(),
            field_path: field_path.to_string(),
            item_index,
        }
    }

    /// The field path with literal indices and empty segments removed.
    pub fn canonical_path(&self) -> String {
        FieldPath::parse(&self.field_path).canonical()
    }

    /// Same binding definition, ignoring which item it currently shows.
    pub fn matches(&self, data_source_id: &str, field_path: &str) -> bool {
        self.data_source_id == data_source_id
            && self.canonical_path() == FieldPath::parse(field_path).canonical()
    }
}

// ─── Vector data ─────────────────────────────────────────────────────────

/// A single path command in object-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64),
    CubicTo(f64, f64, f64, f64, f64, f64),
    Close,
}

/// One filled outline of a flattened vector group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    pub commands: Vec<PathCmd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

impl VectorPath {
    /// SVG path data (`M x y L …`).
    pub fn to_svg_data(&self) -> String {
        let mut d = String::new();
        for cmd in &self.commands {
            if !d.is_empty() {
                d.push(' ');
            }
            match *cmd {
                PathCmd::MoveTo(x, y) => d.push_str(&format!("M {x} {y}")),
                PathCmd::LineTo(x, y) => d.push_str(&format!("L {x} {y}")),
                PathCmd::QuadTo(cx, cy, x, y) => d.push_str(&format!("Q {cx} {cy} {x} {y}")),
                PathCmd::CubicTo(c1x, c1y, c2x, c2y, x, y) => {
                    d.push_str(&format!("C {c1x} {c1y} {c2x} {c2y} {x} {y}"))
                }
                PathCmd::Close => d.push('Z'),
            }
        }
        d
    }
}

/// Primitive shape outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Triangle,
}

// ─── Objects ─────────────────────────────────────────────────────────────

/// What an object is, with the fields that only make sense for that kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Printable page bounds. Exactly one per scene.
    Workspace { width: f64, height: f64, fill: String },

    /// Text box; dynamic when `binding` is set.
    Text {
        text: String,
        font_size: f64,
        font_family: String,
        fill: String,
        width: f64,
        binding: Option<Binding>,
    },

    /// Flattened QR vector group.
    ///
    /// `payload` caches the last encoded string, `svg` the raw markup it
    /// was built from. `width`/`height` are the natural (unscaled) size.
    QrCode {
        payload: String,
        svg: String,
        paths: Vec<VectorPath>,
        width: f64,
        height: f64,
        binding: Option<Binding>,
    },

    /// Free-standing raster image.
    Image { src: String, width: f64, height: f64 },

    /// Primitive shape.
    Shape {
        shape: ShapeKind,
        width: f64,
        height: f64,
        fill: String,
        stroke: Option<String>,
        stroke_width: f64,
    },

    /// The single page background image. `width`/`height` are the
    /// natural image size; placement lives in the object's transform.
    BackgroundImage {
        image_url: String,
        width: f64,
        height: f64,
        locked: bool,
    },
}

impl ObjectKind {
    pub(crate) fn id_prefix(&self) -> &'static str {
        match self {
            ObjectKind::Workspace { .. } => "workspace",
            ObjectKind::Text { .. } => "text",
            ObjectKind::QrCode { .. } => "qr",
            ObjectKind::Image { .. } => "image",
            ObjectKind::Shape { .. } => "shape",
            ObjectKind::BackgroundImage { .. } => "background",
        }
    }
}

/// A single object in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: Option<String>,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub visible: bool,
    pub flags: ObjectFlags,
}

impl SceneObject {
    /// Create an object with a fresh id, identity transform and default flags.
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            id: ObjectId::with_prefix(kind.id_prefix()),
            name: None,
            kind,
            transform: Transform::default(),
            visible: true,
            flags: ObjectFlags::default(),
        }
    }

    /// Create the workspace object at the given origin.
    pub fn workspace(width: f64, height: f64, fill: &str) -> Self {
        let mut obj = Self::new(ObjectKind::Workspace {
            width,
            height,
            fill: fill.to_string(),
        });
        obj.name = Some(WORKSPACE_NAME.to_string());
        obj.flags = ObjectFlags::inert();
        obj
    }

    /// Unscaled width and height.
    pub fn natural_size(&self) -> (f64, f64) {
        match &self.kind {
            ObjectKind::Workspace { width, height, .. }
            | ObjectKind::QrCode { width, height, .. }
            | ObjectKind::Image { width, height, .. }
            | ObjectKind::Shape { width, height, .. }
            | ObjectKind::BackgroundImage { width, height, .. } => (*width, *height),
            ObjectKind::Text {
                text,
                font_size,
                width,
                ..
            } => {
                let lines = text.lines().count().max(1) as f64;
                (*width, lines * font_size * LINE_HEIGHT)
            }
        }
    }

    /// Width and height after scaling.
    pub fn scaled_size(&self) -> (f64, f64) {
        let (w, h) = self.natural_size();
        (w * self.transform.scale_x, h * self.transform.scale_y)
    }

    pub fn binding(&self) -> Option<&Binding> {
        match &self.kind {
            ObjectKind::Text { binding, .. } | ObjectKind::QrCode { binding, .. } => {
                binding.as_ref()
            }
            _ => None,
        }
    }

    pub fn binding_mut(&mut self) -> Option<&mut Binding> {
        match &mut self.kind {
            ObjectKind::Text { binding, .. } | ObjectKind::QrCode { binding, .. } => {
                binding.as_mut()
            }
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.binding().is_some()
    }

    pub fn is_workspace(&self) -> bool {
        matches!(self.kind, ObjectKind::Workspace { .. })
    }

    pub fn is_background(&self) -> bool {
        matches!(self.kind, ObjectKind::BackgroundImage { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text { .. })
    }

    pub fn is_qr_code(&self) -> bool {
        matches!(self.kind, ObjectKind::QrCode { .. })
    }

    /// Text content, for text objects.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Current QR payload, for QR objects.
    pub fn qr_payload(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::QrCode { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> SceneObject {
        SceneObject::new(ObjectKind::Text {
            text: content.into(),
            font_size: 20.0,
            font_family: "Arial".into(),
            fill: "#000000".into(),
            width: 100.0,
            binding: None,
        })
    }

    #[test]
    fn text_height_follows_line_count() {
        let one = text("hello");
        let three = text("a\nb\nc");
        assert!((one.natural_size().1 - 20.0 * LINE_HEIGHT).abs() < 1e-9);
        assert!((three.natural_size().1 - 60.0 * LINE_HEIGHT).abs() < 1e-9);
    }

    #[test]
    fn scaled_size_applies_transform() {
        let mut obj = SceneObject::new(ObjectKind::Image {
            src: "a.png".into(),
            width: 400.0,
            height: 200.0,
        });
        obj.transform.scale_x = 0.5;
        obj.transform.scale_y = 2.0;
        assert_eq!(obj.scaled_size(), (200.0, 400.0));
    }

    #[test]
    fn binding_compares_paths_canonically() {
        let b = Binding::new("users", "data[3].profile.name", 2);
        assert_eq!(b.field_path, "data[3].profile.name");
        assert_eq!(b.canonical_path(), "data.profile.name");
        assert!(b.matches("users", "data.profile.name"));
        assert!(b.matches("users", "data[0].profile.name"));
        assert!(!b.matches("orders", "data.profile.name"));
    }

    #[test]
    fn only_text_and_qr_carry_bindings() {
        let mut t = text("x");
        if let ObjectKind::Text { binding, .. } = &mut t.kind {
            *binding = Some(Binding::new("s", "a.b", 0));
        }
        assert!(t.is_dynamic());

        let ws = SceneObject::workspace(100.0, 100.0, "white");
        assert!(!ws.is_dynamic());
        assert!(ws.binding().is_none());
        assert_eq!(ws.name.as_deref(), Some(WORKSPACE_NAME));
        assert!(!ws.flags.selectable);
    }

    #[test]
    fn vector_path_svg_data() {
        let p = VectorPath {
            commands: vec![
                PathCmd::MoveTo(0.0, 0.0),
                PathCmd::LineTo(4.0, 0.0),
                PathCmd::LineTo(4.0, 4.0),
                PathCmd::Close,
            ],
            fill: Some("#000000".into()),
        };
        assert_eq!(p.to_svg_data(), "M 0 0 L 4 0 L 4 4 Z");
    }
}
