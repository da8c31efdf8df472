pub mod binding;
pub mod data_source;
pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod path;
pub mod scene;
pub mod snapshot;

pub use binding::{NOT_AVAILABLE, resolve};
pub use data_source::{
    DataSource, DataSources, FieldNode, FieldType, array_len_at_path, build_field_tree,
    find_first_array_path, format_field_name, value_at_path,
};
pub use document::{BackgroundDimensions, BackgroundImageState, Document, DynamicMetadata};
pub use error::{SnapshotError, SnapshotResult};
pub use id::ObjectId;
pub use model::*;
pub use path::FieldPath;
pub use scene::Scene;
pub use snapshot::{ObjectSnapshot, SNAPSHOT_VERSION, SceneSnapshot};

// Re-export kurbo geometry so downstream crates share one version.
pub use kurbo::{Affine, Rect};
