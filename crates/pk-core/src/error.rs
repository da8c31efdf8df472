pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Failure to read a scene snapshot or persisted document.
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown object type `{0}`")]
    UnknownType(String),

    #[error("`{kind}` object is missing `{field}`")]
    MissingField { kind: String, field: &'static str },
}

impl SnapshotError {
    pub fn missing(kind: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            kind: kind.into(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = SnapshotError::missing("textbox", "text");
        assert_eq!(err.to_string(), "`textbox` object is missing `text`");
    }

    #[test]
    fn json_errors_convert() {
        let err: SnapshotError = serde_json::from_str::<serde_json::Value>("{")
            .map_err(SnapshotError::from)
            .unwrap_err();
        assert!(err.to_string().starts_with("snapshot json error:"));
    }
}
