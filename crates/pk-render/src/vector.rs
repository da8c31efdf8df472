//! SVG markup → scene-native vector paths.
//!
//! Used to turn rendered QR markup into a flat list of filled outlines.
//! Group transforms are baked into the path coordinates.

use crate::error::RenderError;
use pk_core::model::{PathCmd, VectorPath};
use usvg::tiny_skia_path::{PathSegment, Point};

/// Paths pulled out of one SVG document plus its intrinsic size.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedVector {
    pub paths: Vec<VectorPath>,
    pub width: f64,
    pub height: f64,
}

/// Parse `markup` and flatten every visible filled path.
pub fn import_svg(markup: &str) -> Result<ImportedVector, RenderError> {
    let tree = usvg::Tree::from_str(markup, &usvg::Options::default())?;
    let mut paths = Vec::new();
    collect(tree.root(), &mut paths);
    let size = tree.size();
    log::trace!(
        "vector: imported {} paths from {}x{} markup",
        paths.len(),
        size.width(),
        size.height()
    );
    Ok(ImportedVector {
        paths,
        width: f64::from(size.width()),
        height: f64::from(size.height()),
    })
}

fn collect(group: &usvg::Group, out: &mut Vec<VectorPath>) {
    for node in group.children() {
        match node {
            usvg::Node::Group(g) => collect(g, out),
            usvg::Node::Path(p) if p.is_visible() => {
                let Some(fill) = p.fill() else {
                    continue;
                };
                let fill = match fill.paint() {
                    usvg::Paint::Color(c) => {
                        Some(format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue))
                    }
                    _ => None,
                };
                let ts = p.abs_transform();
                let map = |pt: Point| -> (f64, f64) {
                    (
                        f64::from(ts.sx * pt.x + ts.kx * pt.y + ts.tx),
                        f64::from(ts.ky * pt.x + ts.sy * pt.y + ts.ty),
                    )
                };
                let commands = p
                    .data()
                    .segments()
                    .map(|seg| match seg {
                        PathSegment::MoveTo(pt) => {
                            let (x, y) = map(pt);
                            PathCmd::MoveTo(x, y)
                        }
                        PathSegment::LineTo(pt) => {
                            let (x, y) = map(pt);
                            PathCmd::LineTo(x, y)
                        }
                        PathSegment::QuadTo(c, pt) => {
                            let (cx, cy) = map(c);
                            let (x, y) = map(pt);
                            PathCmd::QuadTo(cx, cy, x, y)
                        }
                        PathSegment::CubicTo(c1, c2, pt) => {
                            let (c1x, c1y) = map(c1);
                            let (c2x, c2y) = map(c2);
                            let (x, y) = map(pt);
                            PathCmd::CubicTo(c1x, c1y, c2x, c2y, x, y)
                        }
                        PathSegment::Close => PathCmd::Close,
                    })
                    .collect();
                out.push(VectorPath { commands, fill });
            }
            _ => {}
        }
    }
}
