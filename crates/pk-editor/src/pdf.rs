//! Minimal raster PDF writer.
//!
//! Every page has the same size and carries one full-bleed image. One
//! scene unit maps to one PDF point.

use crate::encode::flatten;
use image::{Rgb, RgbImage, RgbaImage};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

const IMAGE_NAME: Name<'static> = Name(b"Im0");

/// Pages collected in order, written on [`PdfDocument::finish`].
#[derive(Debug, Clone)]
pub struct PdfDocument {
    width: f64,
    height: f64,
    pages: Vec<RgbImage>,
}

impl PdfDocument {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pages: Vec::new(),
        }
    }

    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a page showing `img` stretched over the full page.
    pub fn add_page(&mut self, img: &RgbaImage) {
        self.pages.push(flatten(img, Rgb([255, 255, 255])));
    }

    pub fn finish(self) -> Vec<u8> {
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let mut next = 3;
        let (w, h) = (self.width as f32, self.height as f32);

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);

        let mut kids = Vec::with_capacity(self.pages.len());
        for img in &self.pages {
            let page_id = Ref::new(next);
            let content_id = Ref::new(next + 1);
            let image_id = Ref::new(next + 2);
            next += 3;
            kids.push(page_id);

            let mut image = pdf.image_xobject(image_id, img.as_raw());
            image.width(img.width() as i32);
            image.height(img.height() as i32);
            image.color_space().device_rgb();
            image.bits_per_component(8);
            image.finish();

            let mut content = Content::new();
            content.save_state();
            content.transform([w, 0.0, 0.0, h, 0.0, 0.0]);
            content.x_object(IMAGE_NAME);
            content.restore_state();
            pdf.stream(content_id, &content.finish());

            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, w, h));
            page.parent(tree_id);
            page.contents(content_id);
            page.resources().x_objects().pair(IMAGE_NAME, image_id);
            page.finish();
        }

        let count = kids.len() as i32;
        pdf.pages(tree_id).kids(kids).count(count);
        let bytes = pdf.finish();
        log::debug!(
            "pdf: {count} pages {}x{} {:?}, {} bytes",
            self.width,
            self.height,
            self.orientation(),
            bytes.len()
        );
        bytes
    }
}
