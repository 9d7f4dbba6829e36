//! mdpush core - Markdown import engine
//!
//! This crate contains the import logic, independent of any particular
//! remote service:
//! - Image extraction and placeholder substitution
//! - Local image path resolution confined to the Markdown directory
//! - Publishing staged images through an object store
//! - Locating placeholders in a remote document and building edit scripts
//! - Configuration management

pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod image;
pub mod import;
pub mod path;
pub mod publish;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use document::{DocumentModel, OffsetRange};
pub use edit::{EditOperation, MissingImagePolicy};
pub use error::ImportError;
pub use image::ImageReference;
pub use import::{ImportOptions, ImportReport, Importer};
pub use store::{
    CallContext, DocumentStore, DocumentTarget, ObjectStore, SeededDocument, StoreError,
};
