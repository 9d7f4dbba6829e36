//! Remote collaborators the import engine talks to
//!
//! The engine never speaks HTTP itself. Everything remote goes through
//! [`DocumentStore`] and [`ObjectStore`], and every call carries a
//! [`CallContext`] so the caller can cancel or bound it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::document::DocumentModel;
use crate::edit::EditOperation;

/// Error returned by a remote collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Cancellation and deadline carried through every remote call
#[derive(Debug, Clone)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline that is only cancelled explicitly
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Derive a child that shares this context's cancellation and adds a deadline
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// A fresh context bounded by `timeout` that ignores any caller's cancellation.
    ///
    /// Used for compensating actions: cleanup must still run after the
    /// operation that triggered it was cancelled.
    pub fn detached(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancel this context and every child derived with [`with_timeout`](Self::with_timeout)
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail fast if the context is cancelled or past its deadline
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if matches!(self.remaining(), Some(left) if left.is_zero()) {
            return Err(StoreError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

/// Where the imported text should land
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTarget {
    /// Create a new document with this title
    New { title: String },
    /// Append to an existing document
    Existing { id: String },
}

/// A document after the imported text was written to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededDocument {
    pub id: String,
    /// Absolute index where the inserted text starts; earlier content predates the import
    pub start_index: usize,
}

/// Remote structured document service
pub trait DocumentStore {
    /// Create (or open) the target document and insert `initial_text` into it
    fn create_or_get_document(
        &self,
        ctx: &CallContext,
        target: &DocumentTarget,
        initial_text: &str,
    ) -> Result<SeededDocument, StoreError>;

    /// Fetch the current structural content of a document
    fn get_document_model(
        &self,
        ctx: &CallContext,
        document_id: &str,
    ) -> Result<DocumentModel, StoreError>;

    /// Apply all operations as one atomic batched mutation, in order
    fn batch_apply(
        &self,
        ctx: &CallContext,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), StoreError>;
}

/// Result of uploading an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub id: String,
    /// Public content URL, when the store returns one at upload time
    pub url: Option<String>,
}

/// Remote object store used to stage images
pub trait ObjectStore {
    fn upload(
        &self,
        ctx: &CallContext,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<UploadedObject, StoreError>;

    /// Grant public, read-only access to an object
    fn set_public_readable(&self, ctx: &CallContext, object_id: &str) -> Result<(), StoreError>;

    /// Fetch the public content URL of an object
    fn get_public_url(&self, ctx: &CallContext, object_id: &str) -> Result<String, StoreError>;

    fn delete(&self, ctx: &CallContext, object_id: &str) -> Result<(), StoreError>;
}
