//! Staging local images in a public object store

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ImportError;
use crate::store::{CallContext, ObjectStore};

/// Default budget for best-effort cleanup calls
pub const DEFAULT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default size limit for a single image
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// A staged image the document renderer can fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedImage {
    pub url: String,
    /// Object to delete once the image has been inserted
    pub object_id: String,
}

/// MIME type for a supported image extension (case-insensitive)
pub fn mime_type_for(path: &Path) -> Result<&'static str, ImportError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        _ => Err(ImportError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

/// Uploads local images and makes them publicly readable
pub struct ImagePublisher<'a, O: ObjectStore + ?Sized> {
    store: &'a O,
    cleanup_timeout: Duration,
    max_bytes: u64,
}

impl<'a, O: ObjectStore + ?Sized> ImagePublisher<'a, O> {
    pub fn new(store: &'a O) -> Self {
        Self {
            store,
            cleanup_timeout: DEFAULT_CLEANUP_TIMEOUT,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Upload `path`, grant public read access and return its URL.
    ///
    /// Format and size are checked before any network call. If the object
    /// cannot be made public or no URL can be obtained, it is deleted again
    /// before the error is returned.
    pub fn publish(&self, ctx: &CallContext, path: &Path) -> Result<PublishedImage, ImportError> {
        let mime_type = mime_type_for(path)?;

        let size = fs::metadata(path)
            .map_err(|source| ImportError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if size > self.max_bytes {
            return Err(ImportError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_bytes,
            });
        }

        let bytes = fs::read(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let uploaded = self
            .store
            .upload(ctx, bytes, mime_type)
            .map_err(ImportError::Upload)?;
        log::debug!("Uploaded {} as {}", path.display(), uploaded.id);

        if let Err(source) = self.store.set_public_readable(ctx, &uploaded.id) {
            self.discard(&uploaded.id);
            return Err(ImportError::Permission {
                object_id: uploaded.id,
                source,
            });
        }

        let url = match uploaded.url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => match self.store.get_public_url(ctx, &uploaded.id) {
                Ok(url) if !url.is_empty() => url,
                Ok(_) => {
                    self.discard(&uploaded.id);
                    return Err(ImportError::UrlResolution {
                        object_id: uploaded.id,
                        source: None,
                    });
                }
                Err(source) => {
                    self.discard(&uploaded.id);
                    return Err(ImportError::UrlResolution {
                        object_id: uploaded.id,
                        source: Some(source),
                    });
                }
            },
        };

        Ok(PublishedImage {
            url,
            object_id: uploaded.id,
        })
    }

    /// Best-effort delete under a context detached from the caller's
    pub fn discard(&self, object_id: &str) {
        let ctx = CallContext::detached(self.cleanup_timeout);
        match self.store.delete(&ctx, object_id) {
            Ok(()) => log::debug!("Deleted staged object {}", object_id),
            Err(e) => log::warn!("Failed to delete staged object {}: {}", object_id, e),
        }
    }
}
