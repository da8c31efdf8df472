//! Serialized scene state.
//!
//! `ObjectSnapshot` is the flat camelCase property bag written to history
//! entries and saved documents. The `type` tag uses the familiar canvas
//! vocabulary (`rect`, `textbox`, `group`, `image`) and the extra binding
//! and background tags sit alongside the geometry.

use crate::error::SnapshotError;
use crate::id::ObjectId;
use crate::model::{
    Binding, ObjectFlags, ObjectKind, SceneObject, ShapeKind, Transform, VectorPath,
    WORKSPACE_NAME,
};
use serde::{Deserialize, Serialize};

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: &str = "5.2.4";

const TYPE_RECT: &str = "rect";
const TYPE_ELLIPSE: &str = "ellipse";
const TYPE_TRIANGLE: &str = "triangle";
const TYPE_TEXTBOX: &str = "textbox";
const TYPE_GROUP: &str = "group";
const TYPE_IMAGE: &str = "image";

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Flat, serializable view of one scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default = "yes")]
    pub visible: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evented: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_controls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_movement_x: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_movement_y: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_scaling_x: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_scaling_y: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_rotation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<VectorPath>>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_svg_string: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_background_image: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Default for ObjectSnapshot {
    fn default() -> Self {
        Self {
            kind: String::new(),
            id: None,
            name: None,
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            width: None,
            height: None,
            visible: true,
            selectable: None,
            evented: None,
            has_controls: None,
            lock_movement_x: None,
            lock_movement_y: None,
            lock_scaling_x: None,
            lock_scaling_y: None,
            lock_rotation: None,
            fill: None,
            stroke: None,
            stroke_width: None,
            text: None,
            font_size: None,
            font_family: None,
            src: None,
            paths: None,
            is_dynamic: false,
            data_source_id: None,
            field_path: None,
            item_index: None,
            qr_url: None,
            qr_svg_string: None,
            is_background_image: false,
            is_locked: None,
            image_url: None,
        }
    }
}

impl ObjectSnapshot {
    fn write_binding(&mut self, binding: Option<&Binding>) {
        if let Some(b) = binding {
            self.is_dynamic = true;
            self.data_source_id = Some(b.data_source_id.clone());
            self.field_path = Some(b.field_path.clone());
            self.item_index = Some(b.item_index);
        }
    }

    fn read_binding(&self) -> Result<Option<Binding>, SnapshotError> {
        if !self.is_dynamic {
            return Ok(None);
        }
        let source = self
            .data_source_id
            .as_deref()
            .ok_or_else(|| SnapshotError::missing(&self.kind, "dataSourceId"))?;
        let path = self
            .field_path
            .as_deref()
            .ok_or_else(|| SnapshotError::missing(&self.kind, "fieldPath"))?;
        Ok(Some(Binding::new(
            source,
            path,
            self.item_index.unwrap_or(0),
        )))
    }

    fn size(&self) -> Result<(f64, f64), SnapshotError> {
        let w = self
            .width
            .ok_or_else(|| SnapshotError::missing(&self.kind, "width"))?;
        let h = self
            .height
            .ok_or_else(|| SnapshotError::missing(&self.kind, "height"))?;
        Ok((w, h))
    }

    /// Stored flags layered over a kind-specific base.
    fn read_flags(&self, base: ObjectFlags) -> ObjectFlags {
        ObjectFlags {
            selectable: self.selectable.unwrap_or(base.selectable),
            evented: self.evented.unwrap_or(base.evented),
            has_controls: self.has_controls.unwrap_or(base.has_controls),
            lock_movement_x: self.lock_movement_x.unwrap_or(base.lock_movement_x),
            lock_movement_y: self.lock_movement_y.unwrap_or(base.lock_movement_y),
            lock_scaling_x: self.lock_scaling_x.unwrap_or(base.lock_scaling_x),
            lock_scaling_y: self.lock_scaling_y.unwrap_or(base.lock_scaling_y),
            lock_rotation: self.lock_rotation.unwrap_or(base.lock_rotation),
        }
    }
}

impl From<&SceneObject> for ObjectSnapshot {
    fn from(obj: &SceneObject) -> Self {
        let t = obj.transform;
        let f = obj.flags;
        let mut snap = ObjectSnapshot {
            id: Some(obj.id),
            name: obj.name.clone(),
            left: t.left,
            top: t.top,
            scale_x: t.scale_x,
            scale_y: t.scale_y,
            angle: t.angle,
            visible: obj.visible,
            selectable: Some(f.selectable),
            evented: Some(f.evented),
            has_controls: Some(f.has_controls),
            lock_movement_x: Some(f.lock_movement_x),
            lock_movement_y: Some(f.lock_movement_y),
            lock_scaling_x: Some(f.lock_scaling_x),
            lock_scaling_y: Some(f.lock_scaling_y),
            lock_rotation: Some(f.lock_rotation),
            ..ObjectSnapshot::default()
        };
        let (w, h) = obj.natural_size();
        snap.width = Some(w);
        snap.height = Some(h);

        match &obj.kind {
            ObjectKind::Workspace { fill, .. } => {
                snap.kind = TYPE_RECT.into();
                snap.name = Some(WORKSPACE_NAME.into());
                snap.fill = Some(fill.clone());
            }
            ObjectKind::Text {
                text,
                font_size,
                font_family,
                fill,
                binding,
                ..
            } => {
                snap.kind = TYPE_TEXTBOX.into();
                snap.text = Some(text.clone());
                snap.font_size = Some(*font_size);
                snap.font_family = Some(font_family.clone());
                snap.fill = Some(fill.clone());
                snap.write_binding(binding.as_ref());
            }
            ObjectKind::QrCode {
                payload,
                svg,
                paths,
                binding,
                ..
            } => {
                snap.kind = TYPE_GROUP.into();
                snap.qr_url = Some(payload.clone());
                snap.qr_svg_string = Some(svg.clone());
                snap.paths = Some(paths.clone());
                snap.write_binding(binding.as_ref());
            }
            ObjectKind::Image { src, .. } => {
                snap.kind = TYPE_IMAGE.into();
                snap.src = Some(src.clone());
            }
            ObjectKind::Shape {
                shape,
                fill,
                stroke,
                stroke_width,
                ..
            } => {
                snap.kind = match shape {
                    ShapeKind::Rectangle => TYPE_RECT,
                    ShapeKind::Ellipse => TYPE_ELLIPSE,
                    ShapeKind::Triangle => TYPE_TRIANGLE,
                }
                .into();
                snap.fill = Some(fill.clone());
                snap.stroke = stroke.clone();
                snap.stroke_width = Some(*stroke_width);
            }
            ObjectKind::BackgroundImage {
                image_url, locked, ..
            } => {
                snap.kind = TYPE_IMAGE.into();
                snap.src = Some(image_url.clone());
                snap.is_background_image = true;
                snap.is_locked = Some(*locked);
                snap.image_url = Some(image_url.clone());
            }
        }
        snap
    }
}

impl TryFrom<ObjectSnapshot> for SceneObject {
    type Error = SnapshotError;

    fn try_from(snap: ObjectSnapshot) -> Result<Self, Self::Error> {
        let mut base = ObjectFlags::default();
        let kind = match snap.kind.as_str() {
            TYPE_RECT if snap.name.as_deref() == Some(WORKSPACE_NAME) => {
                let (width, height) = snap.size()?;
                base = ObjectFlags::inert();
                ObjectKind::Workspace {
                    width,
                    height,
                    fill: snap.fill.clone().unwrap_or_else(|| "white".into()),
                }
            }
            TYPE_RECT | TYPE_ELLIPSE | TYPE_TRIANGLE => {
                let (width, height) = snap.size()?;
                let shape = match snap.kind.as_str() {
                    TYPE_ELLIPSE => ShapeKind::Ellipse,
                    TYPE_TRIANGLE => ShapeKind::Triangle,
                    _ => ShapeKind::Rectangle,
                };
                ObjectKind::Shape {
                    shape,
                    width,
                    height,
                    fill: snap.fill.clone().unwrap_or_else(|| "#000000".into()),
                    stroke: snap.stroke.clone(),
                    stroke_width: snap.stroke_width.unwrap_or(0.0),
                }
            }
            TYPE_TEXTBOX => {
                let text = snap
                    .text
                    .clone()
                    .ok_or_else(|| SnapshotError::missing(&snap.kind, "text"))?;
                let font_size = snap.font_size.unwrap_or(32.0);
                ObjectKind::Text {
                    width: snap.width.unwrap_or(font_size * text.chars().count() as f64 * 0.6),
                    text,
                    font_size,
                    font_family: snap.font_family.clone().unwrap_or_else(|| "Arial".into()),
                    fill: snap.fill.clone().unwrap_or_else(|| "black".into()),
                    binding: snap.read_binding()?,
                }
            }
            TYPE_GROUP if snap.qr_svg_string.is_some() || snap.qr_url.is_some() => {
                let (width, height) = snap.size()?;
                ObjectKind::QrCode {
                    payload: snap.qr_url.clone().unwrap_or_default(),
                    svg: snap.qr_svg_string.clone().unwrap_or_default(),
                    paths: snap.paths.clone().unwrap_or_default(),
                    width,
                    height,
                    binding: snap.read_binding()?,
                }
            }
            TYPE_IMAGE if snap.is_background_image => {
                let (width, height) = snap.size()?;
                let image_url = snap
                    .image_url
                    .clone()
                    .or_else(|| snap.src.clone())
                    .ok_or_else(|| SnapshotError::missing(&snap.kind, "imageUrl"))?;
                let locked = snap.is_locked.unwrap_or(false);
                if locked {
                    base = ObjectFlags::locked();
                }
                ObjectKind::BackgroundImage {
                    image_url,
                    width,
                    height,
                    locked,
                }
            }
            TYPE_IMAGE => {
                let (width, height) = snap.size()?;
                ObjectKind::Image {
                    src: snap
                        .src
                        .clone()
                        .ok_or_else(|| SnapshotError::missing(&snap.kind, "src"))?,
                    width,
                    height,
                }
            }
            other => return Err(SnapshotError::UnknownType(other.to_string())),
        };

        let mut obj = SceneObject::new(kind);
        if let Some(id) = snap.id {
            obj.id = id;
        }
        obj.name = snap.name.clone();
        obj.transform = Transform {
            left: snap.left,
            top: snap.top,
            scale_x: snap.scale_x,
            scale_y: snap.scale_y,
            angle: snap.angle,
        };
        obj.visible = snap.visible;
        obj.flags = snap.read_flags(base);
        Ok(obj)
    }
}

/// The complete object list of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub version: String,
    pub objects: Vec<ObjectSnapshot>,
}

impl SceneSnapshot {
    pub fn new(objects: Vec<ObjectSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            objects,
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The workspace entry, if present.
    pub fn workspace(&self) -> Option<&ObjectSnapshot> {
        self.objects
            .iter()
            .find(|o| o.kind == TYPE_RECT && o.name.as_deref() == Some(WORKSPACE_NAME))
    }
}
