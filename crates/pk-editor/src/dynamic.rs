//! Data-bound text and QR codes.
//!
//! Bound nodes carry `(data_source_id, field_path, item_index)`. A rebind
//! re-resolves every node bound to the same source and path at a new item
//! index. Text changes in place. A QR code is a flattened vector group, so
//! it is re-rendered and swapped in at the same z-index with the same
//! footprint.

use crate::config::{EditorConfig, TextOptions};
use crate::error::{EditorError, EditorResult};
use crate::services::QrRenderer;
use pk_core::binding::{NOT_AVAILABLE, resolve};
use pk_core::id::ObjectId;
use pk_core::model::{Binding, ObjectKind, SceneObject};
use pk_core::path::FieldPath;
use pk_core::scene::Scene;
use pk_render::vector::import_svg;
use serde_json::Value;
use std::time::Duration;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// Estimated box width for `text`.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    (longest as f64 * font_size * GLYPH_ADVANCE).max(font_size)
}

/// Encoded QR content for a resolved value.
pub fn qr_payload(prefix: &str, value: &str) -> String {
    if value == NOT_AVAILABLE {
        value.to_string()
    } else {
        format!("{prefix}{value}")
    }
}

// ─── Attach ──────────────────────────────────────────────────────────────

/// Add a text box centered on the workspace and select it.
pub fn add_text(
    scene: &mut Scene,
    options: &TextOptions,
    value: &str,
    binding: Option<Binding>,
) -> ObjectId {
    let width = options
        .width
        .unwrap_or_else(|| text_width(value, options.font_size));
    let obj = SceneObject::new(ObjectKind::Text {
        text: value.to_string(),
        font_size: options.font_size,
        font_family: options.font_family.clone(),
        fill: options.fill.clone(),
        width,
        binding,
    });
    let id = scene.add(obj);
    scene.center_object(id);
    scene.select(id);
    id
}

/// Render `payload` and build an unplaced QR object from the result.
///
/// The render is raced against `timeout` on the tokio timer.
pub async fn render_qr<R: QrRenderer>(
    renderer: &R,
    payload: &str,
    timeout: Duration,
    binding: Option<Binding>,
) -> EditorResult<SceneObject> {
    let svg = match tokio::time::timeout(timeout, renderer.render(payload)).await {
        Ok(Ok(svg)) => svg,
        Ok(Err(err)) => return Err(EditorError::asset(format!("qr render: {err}"))),
        Err(_) => {
            return Err(EditorError::asset(format!(
                "qr render timed out after {} ms",
                timeout.as_millis()
            )));
        }
    };
    let imported = import_svg(&svg).map_err(|e| EditorError::asset(format!("qr markup: {e}")))?;
    if imported.width <= 0.0 || imported.height <= 0.0 {
        return Err(EditorError::asset("qr markup has no size"));
    }
    Ok(SceneObject::new(ObjectKind::QrCode {
        payload: payload.to_string(),
        svg,
        paths: imported.paths,
        width: imported.width,
        height: imported.height,
        binding,
    }))
}

/// Add a QR code scaled to the configured footprint, centered on the
/// workspace and selected.
///
/// With a binding and source data the payload is the resolved value;
/// otherwise `url` is encoded as given.
pub async fn add_qr_code<R: QrRenderer>(
    scene: &mut Scene,
    config: &EditorConfig,
    renderer: &R,
    url: &str,
    binding: Option<Binding>,
    data: Option<&Value>,
) -> EditorResult<ObjectId> {
    let payload = match (&binding, data) {
        (Some(b), Some(data)) => qr_payload(
            &config.qr_url_prefix,
            &resolve(data, &b.field_path, b.item_index),
        ),
        _ => url.to_string(),
    };
    let mut obj = render_qr(renderer, &payload, config.qr_timeout(), binding).await?;
    let (w, h) = obj.natural_size();
    let scale = (config.qr_size / w).min(config.qr_size / h);
    obj.transform.scale_x = scale;
    obj.transform.scale_y = scale;

    let id = scene.add(obj);
    scene.center_object(id);
    scene.select(id);
    log::info!("qr: added {id} encoding {payload:?}");
    Ok(id)
}

// ─── Rebind ──────────────────────────────────────────────────────────────

fn bound_to(obj: &SceneObject, data_source_id: &str, field_path: &str) -> bool {
    obj.binding()
        .is_some_and(|b| b.matches(data_source_id, field_path))
}

/// Re-resolve every text node bound to `(data_source_id, field_path)` at
/// `item_index`. Returns the number of nodes updated.
pub fn update_dynamic_text(
    scene: &mut Scene,
    data_source_id: &str,
    field_path: &str,
    item_index: usize,
    data: &Value,
) -> usize {
    let path = FieldPath::parse(field_path).canonical();
    let value = resolve(data, &path, item_index);
    let ids = scene.query(|o| o.is_text() && bound_to(o, data_source_id, &path));

    for id in &ids {
        if let Some(obj) = scene.get_mut(*id) {
            if let ObjectKind::Text { text, binding, .. } = &mut obj.kind {
                *text = value.clone();
                if let Some(b) = binding {
                    b.item_index = item_index;
                }
            }
        }
    }
    if !ids.is_empty() {
        scene.mark_modified();
    }
    log::debug!(
        "rebind text {data_source_id}:{path}[{item_index}] -> {value:?} ({} nodes)",
        ids.len()
    );
    ids.len()
}

/// Re-render every QR node bound to `(data_source_id, field_path)` at
/// `item_index`. Returns the number of nodes updated.
///
/// A replacement keeps the old id, z-index and transform, rescaled only if
/// the new graphic has a different natural size. A node whose render fails
/// is logged and left as it was.
pub async fn update_dynamic_qr_codes<R: QrRenderer>(
    scene: &mut Scene,
    config: &EditorConfig,
    renderer: &R,
    data_source_id: &str,
    field_path: &str,
    item_index: usize,
    data: &Value,
) -> usize {
    let path = FieldPath::parse(field_path).canonical();
    let payload = qr_payload(
        &config.qr_url_prefix,
        &resolve(data, &path, item_index),
    );
    let ids = scene.query(|o| o.is_qr_code() && bound_to(o, data_source_id, &path));

    let mut updated = 0;
    for id in ids {
        let Some(old) = scene.get(id) else {
            continue;
        };
        let Some(mut binding) = old.binding().cloned() else {
            continue;
        };
        binding.item_index = item_index;

        if old.qr_payload() == Some(payload.as_str()) {
            if let Some(b) = scene.get_mut(id).and_then(SceneObject::binding_mut) {
                b.item_index = item_index;
            }
            updated += 1;
            continue;
        }

        let mut fresh = match render_qr(renderer, &payload, config.qr_timeout(), Some(binding)).await
        {
            Ok(obj) => obj,
            Err(err) => {
                log::warn!("rebind qr {id}: {err}");
                continue;
            }
        };
        let Some((index, old)) = scene.remove(id) else {
            continue;
        };
        let (new_w, new_h) = fresh.natural_size();
        fresh.transform = old.transform;
        if (new_w, new_h) != old.natural_size() {
            let (old_w, old_h) = old.scaled_size();
            fresh.transform.scale_x = old_w / new_w;
            fresh.transform.scale_y = old_h / new_h;
        }
        fresh.id = old.id;
        fresh.name = old.name;
        fresh.visible = old.visible;
        fresh.flags = old.flags;
        scene.insert_at(index, fresh);
        updated += 1;
    }
    if updated > 0 {
        scene.mark_modified();
    }
    log::debug!("rebind qr {data_source_id}:{path}[{item_index}] -> {payload:?} ({updated} nodes)");
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Renders a square whose size grows with the payload length.
    struct SquareQr;

    impl QrRenderer for SquareQr {
        async fn render(&self, payload: &str) -> Result<String, String> {
            if payload.contains("fail") {
                return Err("encoder exploded".into());
            }
            let n = 21 + payload.len() % 4 * 4;
            Ok(format!(
                r##"<svg xmlns="http://www.w3.org/2000/svg" width="{n}" height="{n}"><path d="M0 0h7v7H0z" fill="#000000"/></svg>"##
            ))
        }
    }

    fn data() -> Value {
        json!({"items": [{"name": "A", "url": "a"}, {"name": "B", "url": "bb"}, {"url": "fail"}]})
    }

    #[test]
    fn text_is_centered_and_selected() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let id = add_text(&mut scene, &TextOptions::default(), "Hello", None);
        let obj = scene.get(id).unwrap();
        let (w, h) = obj.scaled_size();
        assert!((obj.transform.left + w / 2.0 - 400.0).abs() < 1e-9);
        assert!((obj.transform.top + h / 2.0 - 300.0).abs() < 1e-9);
        assert_eq!(scene.selection(), &[id]);
    }

    #[test]
    fn text_rebind_matches_source_and_path_only() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let opts = TextOptions::default();
        let a = add_text(&mut scene, &opts, "A", Some(Binding::new("src", "items[0].name", 0)));
        let other = add_text(&mut scene, &opts, "A", Some(Binding::new("other", "items.name", 0)));
        let plain = add_text(&mut scene, &opts, "static", None);

        assert_eq!(update_dynamic_text(&mut scene, "src", "items.name", 1, &data()), 1);
        assert_eq!(scene.get(a).unwrap().text(), Some("B"));
        assert_eq!(scene.get(a).unwrap().binding().unwrap().item_index, 1);
        assert_eq!(scene.get(other).unwrap().text(), Some("A"));
        assert_eq!(scene.get(plain).unwrap().text(), Some("static"));

        update_dynamic_text(&mut scene, "src", "items.name", 2, &data());
        assert_eq!(scene.get(a).unwrap().text(), Some(NOT_AVAILABLE));
    }

    #[tokio::test]
    async fn qr_is_scaled_to_footprint() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let config = EditorConfig::default();
        let id = add_qr_code(
            &mut scene,
            &config,
            &SquareQr,
            "https://fallback",
            Some(Binding::new("src", "items.url", 0)),
            Some(&data()),
        )
        .await
        .unwrap();
        let obj = scene.get(id).unwrap();
        assert_eq!(obj.qr_payload(), Some("a"));
        let (w, h) = obj.scaled_size();
        assert!((w - 200.0).abs() < 1e-9 && (h - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn qr_rebind_preserves_slot_and_footprint() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let config = EditorConfig::default();
        let id = add_qr_code(
            &mut scene,
            &config,
            &SquareQr,
            "",
            Some(Binding::new("src", "items.url", 0)),
            Some(&data()),
        )
        .await
        .unwrap();
        add_text(&mut scene, &config.text, "on top", None);
        scene.rotate_object(id, 30.0);
        let before = scene.get(id).unwrap().clone();

        let n = update_dynamic_qr_codes(&mut scene, &config, &SquareQr, "src", "items.url", 1, &data())
            .await;
        assert_eq!(n, 1);
        let after = scene.get(id).unwrap();
        assert_eq!(scene.index_of(id), Some(1));
        assert_eq!(after.qr_payload(), Some("bb"));
        assert_eq!(after.binding().unwrap().item_index, 1);
        assert_eq!(after.transform.angle, 30.0);
        assert_eq!(after.transform.left, before.transform.left);
        let (bw, _) = before.scaled_size();
        let (aw, _) = after.scaled_size();
        assert!((aw - bw).abs() < 1e-9);
        assert_ne!(after.natural_size(), before.natural_size());
    }

    /// Never answers.
    struct StalledQr;

    impl QrRenderer for StalledQr {
        async fn render(&self, _payload: &str) -> Result<String, String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_qr_render_times_out_on_tokio_timer() {
        let err = render_qr(&StalledQr, "x", Duration::from_millis(20), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::AssetFailure(_)));
        assert!(err.to_string().contains("timed out after 20 ms"));
    }

    #[tokio::test]
    async fn failed_qr_render_is_skipped() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let config = EditorConfig::default();
        let id = add_qr_code(
            &mut scene,
            &config,
            &SquareQr,
            "",
            Some(Binding::new("src", "items.url", 0)),
            Some(&data()),
        )
        .await
        .unwrap();
        let n = update_dynamic_qr_codes(&mut scene, &config, &SquareQr, "src", "items.url", 2, &data())
            .await;
        assert_eq!(n, 0);
        assert_eq!(scene.get(id).unwrap().qr_payload(), Some("a"));
    }

    #[tokio::test]
    async fn missing_value_still_renders_placeholder() {
        let mut scene = Scene::with_workspace(800.0, 600.0, "white");
        let mut config = EditorConfig::default();
        config.qr_url_prefix = "https://go.test/".into();
        let id = add_qr_code(
            &mut scene,
            &config,
            &SquareQr,
            "",
            Some(Binding::new("src", "items.url", 0)),
            Some(&data()),
        )
        .await
        .unwrap();
        assert_eq!(scene.get(id).unwrap().qr_payload(), Some("https://go.test/a"));
        let n = update_dynamic_qr_codes(&mut scene, &config, &SquareQr, "src", "items.url", 9, &data())
            .await;
        assert_eq!(n, 1);
        assert_eq!(scene.get(id).unwrap().qr_payload(), Some(NOT_AVAILABLE));
    }
}
