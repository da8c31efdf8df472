pub mod error;
pub mod raster;
pub mod svg;
pub mod vector;

pub use error::{RenderError, RenderResult};
pub use raster::{Rasterizer, SvgRasterizer};
pub use svg::render_svg;
pub use vector::{ImportedVector, import_svg};
