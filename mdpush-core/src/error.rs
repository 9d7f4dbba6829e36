//! Errors raised while importing a Markdown file

use std::path::PathBuf;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unsupported image format '{extension}': {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("image reference '{reference}' escapes {}", base.display())]
    PathEscape { reference: String, base: PathBuf },

    #[error("path not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image {} is {size} bytes, limit is {limit}", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image upload failed")]
    Upload(#[source] StoreError),

    #[error("failed to make object {object_id} public")]
    Permission {
        object_id: String,
        #[source]
        source: StoreError,
    },

    #[error("no public URL available for object {object_id}")]
    UrlResolution {
        object_id: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("images could not be placed: {indices:?}")]
    Unplaced { indices: Vec<usize> },

    #[error(transparent)]
    Store(#[from] StoreError),
}
