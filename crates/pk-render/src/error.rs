pub type RenderResult<T> = Result<T, RenderError>;

/// Failure while turning a scene or markup into pixels or vectors.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("svg error: {0}")]
    Svg(String),

    #[error("cannot allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("encode error: {0}")]
    Encode(String),
}

impl RenderError {
    pub fn svg(msg: impl Into<String>) -> Self {
        Self::Svg(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

impl From<usvg::Error> for RenderError {
    fn from(err: usvg::Error) -> Self {
        Self::Svg(err.to_string())
    }
}
