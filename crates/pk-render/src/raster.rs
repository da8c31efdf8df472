//! Scene → RGBA pixels.
//!
//! The default backend renders the scene to SVG markup and rasterizes it
//! with `usvg` + `resvg` into a `tiny_skia` pixmap.

use crate::error::RenderError;
use crate::svg::render_svg;
use image::RgbaImage;
use kurbo::Rect;
use pk_core::scene::Scene;
use std::path::PathBuf;
use std::sync::Arc;

/// Raster export of a scene region.
pub trait Rasterizer {
    /// Render `region` of `scene` into an image of the region's size
    /// (rounded up to whole pixels).
    fn rasterize(
        &self,
        scene: &Scene,
        region: Rect,
        background: Option<&str>,
    ) -> Result<RgbaImage, RenderError>;
}

/// `resvg`-backed rasterizer.
pub struct SvgRasterizer {
    options: usvg::Options<'static>,
}

impl Default for SvgRasterizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SvgRasterizer {
    /// Build a rasterizer with system fonts loaded. `resources_dir` resolves
    /// relative image paths.
    pub fn new(resources_dir: Option<PathBuf>) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("raster: loaded {} font faces", db.len());
        let options = usvg::Options {
            resources_dir,
            fontdb: Arc::new(db),
            ..Default::default()
        };
        Self { options }
    }
}

impl Rasterizer for SvgRasterizer {
    fn rasterize(
        &self,
        scene: &Scene,
        region: Rect,
        background: Option<&str>,
    ) -> Result<RgbaImage, RenderError> {
        let markup = render_svg(scene, region, background);
        log::trace!(
            "raster: {}x{} region, {} bytes of markup",
            region.width(),
            region.height(),
            markup.len()
        );
        let tree = usvg::Tree::from_str(&markup, &self.options)?;
        render_tree(
            &tree,
            region.width().ceil() as u32,
            region.height().ceil() as u32,
        )
    }
}

fn render_tree(tree: &usvg::Tree, width: u32, height: u32) -> Result<RgbaImage, RenderError> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(RenderError::Pixmap { width, height })?;
    resvg::render(tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| RenderError::encode("pixel buffer size mismatch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_core::model::{ObjectKind, SceneObject, ShapeKind, Transform};

    fn red_square_scene() -> Scene {
        let mut scene = Scene::with_workspace(40.0, 20.0, "white");
        let mut sq = SceneObject::new(ObjectKind::Shape {
            shape: ShapeKind::Rectangle,
            width: 10.0,
            height: 10.0,
            fill: "#ff0000".into(),
            stroke: None,
            stroke_width: 0.0,
        });
        sq.transform = Transform::at(20.0, 0.0);
        scene.add(sq);
        scene
    }

    #[test]
    fn region_determines_image_size() {
        let scene = red_square_scene();
        let img = SvgRasterizer::default()
            .rasterize(&scene, Rect::new(0.0, 0.0, 40.0, 20.0), None)
            .unwrap();
        assert_eq!(img.dimensions(), (40, 20));
    }

    #[test]
    fn objects_land_at_their_transform() {
        let scene = red_square_scene();
        let img = SvgRasterizer::default()
            .rasterize(&scene, Rect::new(0.0, 0.0, 40.0, 20.0), None)
            .unwrap();
        assert_eq!(img.get_pixel(25, 5).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(25, 15).0, [255, 255, 255, 255]);
    }

    #[test]
    fn hidden_workspace_leaves_transparency() {
        let mut scene = red_square_scene();
        scene.workspace_mut().unwrap().visible = false;
        let img = SvgRasterizer::default()
            .rasterize(&scene, Rect::new(0.0, 0.0, 40.0, 20.0), None)
            .unwrap();
        assert_eq!(img.get_pixel(5, 5).0[3], 0);
    }

    #[test]
    fn zero_sized_region_is_an_error() {
        let scene = red_square_scene();
        let err = SvgRasterizer::default()
            .rasterize(&scene, Rect::new(0.0, 0.0, 0.0, 0.0), None)
            .unwrap_err();
        assert!(matches!(err, RenderError::Svg(_) | RenderError::Pixmap { .. }));
    }
}
