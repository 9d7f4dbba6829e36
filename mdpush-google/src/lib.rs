//! mdpush Google - Docs and Drive adapters
//!
//! This crate contains all HTTP integration:
//! - Authenticated blocking client with context-bounded timeouts
//! - `DocumentStore` backed by the Google Docs API
//! - `ObjectStore` backed by Google Drive
//! - JSON wire types and their conversion into the core document model

pub mod client;
pub mod docs;
pub mod drive;
pub mod wire;

// Re-export main types
pub use client::GoogleClient;
pub use docs::GoogleDocs;
pub use drive::GoogleDrive;
