//! Persisted design documents.
//!
//! ```json
//! {
//!   "width": 1200, "height": 900,
//!   "objects": { "version": "5.2.4", "objects": [ ... ] },
//!   "backgroundImageState": { "hasBackgroundImage": true, "isLocked": false,
//!     "imageUrl": "...", "dimensions": { "width": .., "height": .., "scaleX": ..,
//!     "scaleY": .., "left": .., "top": .. } },
//!   "dynamicMetadata": { "totalDynamicElements": 2, "savedAt": "2026-..." }
//! }
//! ```
//!
//! Older files that hold only the bare `{version, objects}` snapshot are
//! accepted on load.

use crate::error::SnapshotError;
use crate::model::ObjectKind;
use crate::scene::Scene;
use crate::snapshot::SceneSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundDimensions {
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundImageState {
    pub has_background_image: bool,
    pub is_locked: bool,
    pub image_url: Option<String>,
    pub dimensions: Option<BackgroundDimensions>,
}

impl BackgroundImageState {
    /// Describe the background currently placed in `scene`.
    pub fn from_scene(scene: &Scene) -> Self {
        let Some(bg) = scene.background() else {
            return Self::default();
        };
        let ObjectKind::BackgroundImage {
            image_url,
            width,
            height,
            locked,
        } = &bg.kind
        else {
            return Self::default();
        };
        let t = bg.transform;
        Self {
            has_background_image: true,
            is_locked: *locked,
            image_url: Some(image_url.clone()),
            dimensions: Some(BackgroundDimensions {
                width: *width,
                height: *height,
                scale_x: t.scale_x,
                scale_y: t.scale_y,
                left: t.left,
                top: t.top,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicMetadata {
    pub total_dynamic_elements: usize,
    pub saved_at: DateTime<Utc>,
}

/// A saved design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Workspace width; `0` when unknown.
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    pub objects: SceneSnapshot,
    #[serde(default)]
    pub background_image_state: BackgroundImageState,
    #[serde(default)]
    pub dynamic_metadata: DynamicMetadata,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Full(Document),
    Bare(SceneSnapshot),
}

impl Document {
    /// Capture `scene` with the given workspace size.
    pub fn capture(scene: &Scene, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            objects: scene.to_snapshot(),
            background_image_state: BackgroundImageState::from_scene(scene),
            dynamic_metadata: DynamicMetadata {
                total_dynamic_elements: scene.dynamic_count(),
                saved_at: Utc::now(),
            },
        }
    }

    /// Parse a full document or a bare scene snapshot.
    pub fn parse(json: &str) -> Result<Self, SnapshotError> {
        match serde_json::from_str::<DocumentFile>(json)? {
            DocumentFile::Full(doc) => Ok(doc),
            DocumentFile::Bare(objects) => {
                let (width, height) = objects
                    .workspace()
                    .map(|ws| (ws.width.unwrap_or(0.0), ws.height.unwrap_or(0.0)))
                    .unwrap_or((0.0, 0.0));
                let total = objects.objects.iter().filter(|o| o.is_dynamic).count();
                Ok(Self {
                    width,
                    height,
                    objects,
                    background_image_state: BackgroundImageState::default(),
                    dynamic_metadata: DynamicMetadata {
                        total_dynamic_elements: total,
                        saved_at: DateTime::<Utc>::default(),
                    },
                })
            }
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Workspace size, if the document records one.
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        (self.width > 0.0 && self.height > 0.0).then_some((self.width, self.height))
    }
}
