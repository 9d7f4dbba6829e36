//! Markdown import pipeline
//!
//! Stages, strictly in sequence for one file:
//! 1. extract images and substitute placeholders
//! 2. create (or append to) the remote document with the cleaned text
//! 3. resolve and publish every image
//! 4. re-fetch the document and locate the placeholders in the inserted text
//! 5. build the edit script and apply it as one batch
//! 6. delete the staged uploads

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::document::locate_from;
use crate::edit::{build, EditOperation, MissingImagePolicy};
use crate::error::ImportError;
use crate::image::{extract, ImageReference};
use crate::path::resolve;
use crate::publish::{ImagePublisher, DEFAULT_CLEANUP_TIMEOUT, DEFAULT_MAX_IMAGE_BYTES};
use crate::store::{CallContext, DocumentStore, DocumentTarget, ObjectStore, SeededDocument};

/// Behaviour switches for one import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub missing_images: MissingImagePolicy,
    /// Keep staged uploads instead of deleting them after the batch
    pub keep_uploads: bool,
    pub cleanup_timeout: Duration,
    pub max_image_bytes: u64,
    /// Log every edit operation at info level
    pub trace_edits: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            missing_images: MissingImagePolicy::Skip,
            keep_uploads: false,
            cleanup_timeout: DEFAULT_CLEANUP_TIMEOUT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            trace_edits: false,
        }
    }
}

/// An image that did not make it into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub index: usize,
    pub reference: String,
    pub reason: String,
}

/// Outcome of a finished import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub document_id: String,
    /// Number of images placed in the document
    pub placed: usize,
    pub skipped: Vec<SkippedImage>,
    /// Staged objects still present in the object store
    pub retained_uploads: Vec<String>,
}

/// Runs the import pipeline against injected stores
pub struct Importer<'a, D: DocumentStore + ?Sized, O: ObjectStore + ?Sized> {
    documents: &'a D,
    objects: &'a O,
    options: ImportOptions,
}

impl<'a, D: DocumentStore + ?Sized, O: ObjectStore + ?Sized> Importer<'a, D, O> {
    pub fn new(documents: &'a D, objects: &'a O, options: ImportOptions) -> Self {
        Self {
            documents,
            objects,
            options,
        }
    }

    /// Import the Markdown file at `markdown_path` into `target`
    pub fn import_file(
        &self,
        ctx: &CallContext,
        markdown_path: &Path,
        target: &DocumentTarget,
    ) -> Result<ImportReport, ImportError> {
        let markdown = fs::read_to_string(markdown_path).map_err(|source| ImportError::Io {
            path: markdown_path.to_path_buf(),
            source,
        })?;
        self.import_text(ctx, markdown_path, &markdown, target)
    }

    /// Import `markdown`, resolving local images against `markdown_path`
    pub fn import_text(
        &self,
        ctx: &CallContext,
        markdown_path: &Path,
        markdown: &str,
        target: &DocumentTarget,
    ) -> Result<ImportReport, ImportError> {
        let (cleaned, images) = extract(markdown);
        log::info!(
            "Importing {} with {} image(s)",
            markdown_path.display(),
            images.len()
        );

        let seeded = self.documents.create_or_get_document(ctx, target, &cleaned)?;
        log::info!(
            "Text written to document {} at index {}",
            seeded.id,
            seeded.start_index
        );

        let mut report = ImportReport {
            document_id: seeded.id.clone(),
            ..Default::default()
        };
        if images.is_empty() {
            return Ok(report);
        }

        let publisher = ImagePublisher::new(self.objects)
            .with_cleanup_timeout(self.options.cleanup_timeout)
            .with_max_bytes(self.options.max_image_bytes);

        let mut urls = HashMap::new();
        let mut staged = Vec::new();
        for image in &images {
            match self.image_url(ctx, &publisher, markdown_path, image) {
                Ok((url, object_id)) => {
                    urls.insert(image.index, url);
                    staged.extend(object_id);
                }
                Err(e) if self.options.missing_images == MissingImagePolicy::Skip => {
                    log::warn!("Skipping image {} ({}): {}", image.index, image.original_ref, e);
                    report.skipped.push(SkippedImage {
                        index: image.index,
                        reference: image.original_ref.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    self.cleanup(&publisher, &staged);
                    return Err(e);
                }
            }
        }

        let result = self.place_images(ctx, &seeded, &images, &urls, &mut report);

        if self.options.keep_uploads {
            report.retained_uploads = staged;
        } else {
            self.cleanup(&publisher, &staged);
        }

        result.map(|()| report)
    }

    /// URL for one image, plus the staged object id when it had to be uploaded
    fn image_url(
        &self,
        ctx: &CallContext,
        publisher: &ImagePublisher<'_, O>,
        markdown_path: &Path,
        image: &ImageReference,
    ) -> Result<(String, Option<String>), ImportError> {
        if image.is_remote() {
            return Ok((image.original_ref.clone(), None));
        }
        let local = resolve(markdown_path, &image.original_ref)?;
        let published = publisher.publish(ctx, &local)?;
        Ok((published.url, Some(published.object_id)))
    }

    fn place_images(
        &self,
        ctx: &CallContext,
        seeded: &SeededDocument,
        images: &[ImageReference],
        urls: &HashMap<usize, String>,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let document_id = seeded.id.as_str();
        let model = self.documents.get_document_model(ctx, document_id)?;
        let ranges = locate_from(&model, images.len(), seeded.start_index);

        let script = build(&ranges, images, urls, self.options.missing_images)?;

        for index in &script.skipped {
            if report.skipped.iter().any(|s| s.index == *index) {
                continue;
            }
            let reference = images
                .get(*index)
                .map(|i| i.original_ref.clone())
                .unwrap_or_default();
            log::warn!("Placeholder for image {} not found in document", index);
            report.skipped.push(SkippedImage {
                index: *index,
                reference,
                reason: "placeholder not found in document".to_string(),
            });
        }

        for op in &script.operations {
            self.trace(op);
        }

        if !script.operations.is_empty() {
            self.documents
                .batch_apply(ctx, document_id, &script.operations)?;
        }
        report.placed = script.operations.len() / 2;
        report.skipped.sort_by_key(|s| s.index);

        log::info!(
            "Placed {} image(s) in document {}, {} skipped",
            report.placed,
            document_id,
            report.skipped.len()
        );
        Ok(())
    }

    fn trace(&self, op: &EditOperation) {
        if self.options.trace_edits {
            log::info!("edit: {:?}", op);
        } else {
            log::debug!("edit: {:?}", op);
        }
    }

    fn cleanup(&self, publisher: &ImagePublisher<'_, O>, staged: &[String]) {
        for object_id in staged {
            publisher.discard(object_id);
        }
    }
}
