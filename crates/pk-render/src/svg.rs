//! Scene → SVG markup.
//!
//! Renders a rectangular region of a scene as a standalone SVG document.
//! Every object is placed with `translate(left top) rotate(angle)
//! scale(sx sy)` and drawn in its own local coordinates, so the output
//! matches the object transforms exactly. Hidden objects are skipped.

use kurbo::Rect;
use pk_core::model::{LINE_HEIGHT, ObjectKind, SceneObject, ShapeKind};
use pk_core::scene::Scene;

/// Fraction of the font size from the line top to the baseline.
const BASELINE: f64 = 0.8;

/// Render `region` of `scene` to SVG.
///
/// `background`, when set, fills the whole region beneath all objects.
pub fn render_svg(scene: &Scene, region: Rect, background: Option<&str>) -> String {
    let width = region.width();
    let height = region.height();

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
         width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    ));

    if let Some(fill) = background {
        svg.push_str(&format!(
            "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{}\" />\n",
            escape(fill)
        ));
    }

    let [a, b, c, d, e, f] = scene.viewport().as_coeffs();
    svg.push_str(&format!(
        "<g transform=\"translate({} {})\">\n<g transform=\"matrix({a} {b} {c} {d} {e} {f})\">\n",
        -region.x0, -region.y0
    ));

    for obj in scene.objects().iter().filter(|o| o.visible) {
        render_object(&mut svg, obj);
    }

    svg.push_str("</g>\n</g>\n</svg>");
    svg
}

fn render_object(out: &mut String, obj: &SceneObject) {
    let t = obj.transform;
    out.push_str(&format!(
        "<g id=\"{}\" transform=\"translate({} {}) rotate({}) scale({} {})\">\n",
        escape(obj.id.as_str()),
        t.left,
        t.top,
        t.angle,
        t.scale_x,
        t.scale_y
    ));

    match &obj.kind {
        ObjectKind::Workspace {
            width,
            height,
            fill,
        } => {
            out.push_str(&format!(
                "  <rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"{}\" />\n",
                escape(fill)
            ));
        }

        ObjectKind::Text {
            text,
            font_size,
            font_family,
            fill,
            ..
        } => {
            for (i, line) in text.lines().enumerate() {
                let y = font_size * BASELINE + i as f64 * font_size * LINE_HEIGHT;
                out.push_str(&format!(
                    "  <text x=\"0\" y=\"{y}\" font-family=\"{}\" font-size=\"{font_size}\" fill=\"{}\">{}</text>\n",
                    escape(font_family),
                    escape(fill),
                    escape(line)
                ));
            }
        }

        ObjectKind::QrCode { paths, .. } => {
            for path in paths {
                let fill = path.fill.as_deref().unwrap_or("#000000");
                out.push_str(&format!(
                    "  <path d=\"{}\" fill=\"{}\" />\n",
                    path.to_svg_data(),
                    escape(fill)
                ));
            }
        }

        ObjectKind::Image { src, width, height } => {
            push_image(out, src, *width, *height);
        }

        ObjectKind::BackgroundImage {
            image_url,
            width,
            height,
            ..
        } => {
            push_image(out, image_url, *width, *height);
        }

        ObjectKind::Shape {
            shape,
            width,
            height,
            fill,
            stroke,
            stroke_width,
        } => {
            let stroke = stroke.as_deref().unwrap_or("none");
            let paint = format!(
                "fill=\"{}\" stroke=\"{}\" stroke-width=\"{stroke_width}\"",
                escape(fill),
                escape(stroke)
            );
            match shape {
                ShapeKind::Rectangle => out.push_str(&format!(
                    "  <rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" {paint} />\n"
                )),
                ShapeKind::Ellipse => out.push_str(&format!(
                    "  <ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" {paint} />\n",
                    width / 2.0,
                    height / 2.0,
                    width / 2.0,
                    height / 2.0
                )),
                ShapeKind::Triangle => out.push_str(&format!(
                    "  <polygon points=\"{} 0 {width} {height} 0 {height}\" {paint} />\n",
                    width / 2.0
                )),
            }
        }
    }

    out.push_str("</g>\n");
}

fn push_image(out: &mut String, href: &str, width: f64, height: f64) {
    out.push_str(&format!(
        "  <image x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"none\" xlink:href=\"{}\" />\n",
        escape(href)
    ));
}

/// XML-escape text and attribute values.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
