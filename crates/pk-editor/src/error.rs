use pk_core::SnapshotError;
use pk_render::RenderError;

pub type EditorResult<T> = Result<T, EditorError>;

/// Failure of an editor operation.
///
/// A binding path that does not resolve is not an error (it renders as
/// `"N/A"`), and a data source without array data degrades to a single
/// page export.
#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    /// History entry or persisted document could not be read.
    #[error("snapshot corrupt: {0}")]
    SnapshotCorrupt(#[from] SnapshotError),

    /// An image or QR graphic failed to load or render.
    #[error("asset failure: {0}")]
    AssetFailure(String),

    /// Rasterization or document assembly failed; nothing was written.
    #[error("export failure: {0}")]
    ExportFailure(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::AssetFailure(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailure(msg.into())
    }
}

impl From<RenderError> for EditorError {
    fn from(err: RenderError) -> Self {
        Self::ExportFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(EditorError::asset("x").to_string().starts_with("asset failure:"));
        assert!(EditorError::export("x").to_string().starts_with("export failure:"));
        let snap = SnapshotError::UnknownType("blob".into());
        assert!(
            EditorError::from(snap)
                .to_string()
                .starts_with("snapshot corrupt:")
        );
    }

    #[test]
    fn render_errors_become_export_failures() {
        let err = EditorError::from(RenderError::svg("bad"));
        assert!(matches!(err, EditorError::ExportFailure(_)));
    }
}
