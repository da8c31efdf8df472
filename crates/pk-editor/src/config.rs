//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Defaults for newly created text boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextOptions {
    pub font_family: String,
    pub font_size: f64,
    pub fill: String,
    /// Box width; estimated from the text when unset.
    pub width: Option<f64>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 32.0,
            fill: "black".to_string(),
            width: None,
        }
    }
}

/// Configuration for an [`Editor`](crate::Editor).
///
/// Every field has a default, so a partial JSON object (or `{}`) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Workspace size used for new documents and whenever the workspace
    /// geometry cannot be determined.
    pub default_width: f64,
    pub default_height: f64,
    /// Fill of a fresh workspace.
    pub workspace_fill: String,
    /// Longest side of a newly placed QR code, in scene units.
    pub qr_size: f64,
    /// Upper bound on one QR render.
    pub qr_timeout_ms: u64,
    /// Prepended to a resolved value to form the encoded QR payload.
    pub qr_url_prefix: String,
    /// Maximum history entries; unbounded when unset.
    pub history_limit: Option<usize>,
    /// Base name (without extension) for exported files.
    pub export_file_name: String,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    pub text: TextOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_width: pk_core::DEFAULT_WIDTH,
            default_height: pk_core::DEFAULT_HEIGHT,
            workspace_fill: "white".to_string(),
            qr_size: 200.0,
            qr_timeout_ms: 5000,
            qr_url_prefix: String::new(),
            history_limit: None,
            export_file_name: "design".to_string(),
            jpeg_quality: 92,
            text: TextOptions::default(),
        }
    }
}

impl EditorConfig {
    pub fn qr_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.qr_timeout_ms)
    }
}
