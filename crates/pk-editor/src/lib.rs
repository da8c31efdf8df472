pub mod background;
pub mod config;
pub mod dynamic;
pub mod editor;
pub mod encode;
pub mod error;
pub mod export;
pub mod history;
pub mod pdf;
pub mod services;

pub use background::{BackgroundController, BackgroundInfo, BackgroundListener, BackgroundState};
pub use config::{EditorConfig, TextOptions};
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
pub use export::{
    DataExportRequest, ExportFormat, ExportOutcome, ExportSession, PageRange, SaveOptions,
};
pub use history::{History, HistoryEntry, SaveCallback, SuspendGuard};
pub use pdf::{Orientation, PdfDocument};
pub use services::{
    DirectorySink, FileImageLoader, FileSink, ImageLoader, LoadedImage, MemorySink, QrRenderer,
};
