//! Integration tests for the import pipeline
//!
//! The fake document store keeps a single linear buffer addressed from
//! index 1 and replays edit scripts against it operation by operation, so
//! any ordering mistake shows up as misplaced images or rejected ranges.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use mdpush_core::document::{Paragraph, ParagraphElement, StructuralElement, TextRun};
use mdpush_core::store::UploadedObject;
use mdpush_core::{
    CallContext, DocumentModel, DocumentStore, DocumentTarget, EditOperation, ImportError,
    ImportOptions, Importer, MissingImagePolicy, ObjectStore, SeededDocument, StoreError,
};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Char(char),
    Image(String),
}

#[derive(Default)]
struct FakeDocs {
    buffers: RefCell<HashMap<String, Vec<Slot>>>,
    batches: RefCell<usize>,
    fail_batch: bool,
}

impl FakeDocs {
    fn with_existing(id: &str, text: &str) -> Self {
        let docs = Self::default();
        docs.buffers
            .borrow_mut()
            .insert(id.to_string(), text.chars().map(Slot::Char).collect());
        docs
    }

    /// Document content with images rendered as `[img:url]`
    fn render(&self, id: &str) -> String {
        self.buffers.borrow()[id]
            .iter()
            .map(|slot| match slot {
                Slot::Char(c) => c.to_string(),
                Slot::Image(url) => format!("[img:{}]", url),
            })
            .collect()
    }

    fn apply(buffer: &mut Vec<Slot>, op: &EditOperation) -> Result<(), StoreError> {
        let invalid = |message: String| StoreError::Api {
            status: 400,
            message,
        };
        match op {
            EditOperation::DeleteRange { start, end } => {
                if *start < 1 || start >= end || *end > buffer.len() + 1 {
                    return Err(invalid(format!("bad range {}..{}", start, end)));
                }
                buffer.drain(start - 1..end - 1);
            }
            EditOperation::InsertImage { url, at_index } => {
                if *at_index < 1 || *at_index > buffer.len() + 1 {
                    return Err(invalid(format!("bad index {}", at_index)));
                }
                buffer.insert(at_index - 1, Slot::Image(url.clone()));
            }
        }
        Ok(())
    }
}

impl DocumentStore for FakeDocs {
    fn create_or_get_document(
        &self,
        ctx: &CallContext,
        target: &DocumentTarget,
        initial_text: &str,
    ) -> Result<SeededDocument, StoreError> {
        ctx.check()?;
        let mut buffers = self.buffers.borrow_mut();
        match target {
            DocumentTarget::New { title } => {
                let id = format!("doc-{}", title);
                let mut buffer: Vec<Slot> = initial_text.chars().map(Slot::Char).collect();
                buffer.push(Slot::Char('\n'));
                buffers.insert(id.clone(), buffer);
                Ok(SeededDocument { id, start_index: 1 })
            }
            DocumentTarget::Existing { id } => {
                let buffer = buffers.get_mut(id).ok_or_else(|| StoreError::Api {
                    status: 404,
                    message: "no such document".into(),
                })?;
                let at = buffer.len().saturating_sub(1);
                buffer.splice(at..at, initial_text.chars().map(Slot::Char));
                Ok(SeededDocument {
                    id: id.clone(),
                    start_index: at + 1,
                })
            }
        }
    }

    fn get_document_model(
        &self,
        ctx: &CallContext,
        document_id: &str,
    ) -> Result<DocumentModel, StoreError> {
        ctx.check()?;
        let buffers = self.buffers.borrow();
        let buffer = &buffers[document_id];

        // One paragraph per line, one run per stretch of text
        let mut content = vec![StructuralElement::SectionBreak];
        let mut paragraph = Paragraph::default();
        let mut run: Option<TextRun> = None;
        for (i, slot) in buffer.iter().enumerate() {
            let index = i + 1;
            match slot {
                Slot::Char(c) => {
                    run.get_or_insert_with(|| TextRun::new(index, "")).content.push(*c);
                    if *c == '\n' {
                        if let Some(r) = run.take() {
                            paragraph.elements.push(ParagraphElement::TextRun(r));
                        }
                        content.push(StructuralElement::Paragraph(std::mem::take(
                            &mut paragraph,
                        )));
                    }
                }
                Slot::Image(_) => {
                    if let Some(r) = run.take() {
                        paragraph.elements.push(ParagraphElement::TextRun(r));
                    }
                    paragraph.elements.push(ParagraphElement::Other);
                }
            }
        }
        Ok(DocumentModel::new(document_id, content))
    }

    fn batch_apply(
        &self,
        ctx: &CallContext,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), StoreError> {
        ctx.check()?;
        *self.batches.borrow_mut() += 1;
        if self.fail_batch {
            return Err(StoreError::Api {
                status: 500,
                message: "backend error".into(),
            });
        }
        let mut buffers = self.buffers.borrow_mut();
        // Atomic: work on a copy and commit only if every operation applies
        let mut buffer = buffers[document_id].clone();
        for op in operations {
            Self::apply(&mut buffer, op)?;
        }
        buffers.insert(document_id.to_string(), buffer);
        Ok(())
    }
}

#[derive(Default)]
struct FakeObjects {
    objects: RefCell<HashMap<String, (String, bool)>>,
    uploads: RefCell<usize>,
}

impl FakeObjects {
    fn live(&self) -> usize {
        self.objects.borrow().len()
    }
}

impl ObjectStore for FakeObjects {
    fn upload(
        &self,
        ctx: &CallContext,
        _bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<UploadedObject, StoreError> {
        ctx.check()?;
        let mut uploads = self.uploads.borrow_mut();
        *uploads += 1;
        let id = format!("obj-{}", *uploads);
        self.objects
            .borrow_mut()
            .insert(id.clone(), (mime_type.to_string(), false));
        Ok(UploadedObject {
            url: Some(format!("https://store.test/{}", id)),
            id,
        })
    }

    fn set_public_readable(&self, ctx: &CallContext, object_id: &str) -> Result<(), StoreError> {
        ctx.check()?;
        match self.objects.borrow_mut().get_mut(object_id) {
            Some(entry) => {
                entry.1 = true;
                Ok(())
            }
            None => Err(StoreError::Api {
                status: 404,
                message: object_id.to_string(),
            }),
        }
    }

    fn get_public_url(&self, _ctx: &CallContext, object_id: &str) -> Result<String, StoreError> {
        Ok(format!("https://store.test/{}", object_id))
    }

    fn delete(&self, ctx: &CallContext, object_id: &str) -> Result<(), StoreError> {
        ctx.check()?;
        self.objects.borrow_mut().remove(object_id);
        Ok(())
    }
}

fn workspace(markdown: &str, images: &[&str]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir(dir.path().join("img")).expect("Failed to create image dir");
    for name in images {
        fs::write(dir.path().join(name), b"\x89PNG fake").expect("Failed to write image");
    }
    let doc_path = dir.path().join("note.md");
    fs::write(&doc_path, markdown).expect("Failed to write markdown");
    (dir, doc_path)
}

fn new_doc() -> DocumentTarget {
    DocumentTarget::New {
        title: "note".to_string(),
    }
}

#[test]
fn integration_two_local_images() {
    let (_dir, doc_path) = workspace(
        "Before ![a](img/a.png) middle ![b](img/b.jpg) after",
        &["img/a.png", "img/b.jpg"],
    );
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();

    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(&CallContext::background(), &doc_path, &new_doc())
        .expect("import should succeed");

    assert_eq!(report.document_id, "doc-note");
    assert_eq!(report.placed, 2);
    assert!(report.skipped.is_empty());
    assert_eq!(
        docs.render("doc-note"),
        "Before [img:https://store.test/obj-1] middle [img:https://store.test/obj-2] after\n"
    );
    assert_eq!(*docs.batches.borrow(), 1);
    // Staged uploads are gone once the batch is applied
    assert_eq!(objects.live(), 0);
    assert!(report.retained_uploads.is_empty());
}

#[test]
fn integration_many_images_across_paragraphs() {
    let mut markdown = String::from("# Gallery\n\n");
    let mut names = Vec::new();
    for i in 0..12 {
        markdown.push_str(&format!("Shot {} ![s{}](img/{}.png) done\n\n", i, i, i));
        names.push(format!("img/{}.png", i));
    }
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (_dir, doc_path) = workspace(&markdown, &name_refs);

    let docs = FakeDocs::default();
    let objects = FakeObjects::default();
    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(&CallContext::background(), &doc_path, &new_doc())
        .expect("import should succeed");

    assert_eq!(report.placed, 12);
    let rendered = docs.render("doc-note");
    assert!(!rendered.contains("<<IMG_"));
    for i in 0..12 {
        let line = format!("Shot {} [img:https://store.test/obj-{}] done\n", i, i + 1);
        assert!(rendered.contains(&line), "missing line: {}", line);
    }
}

#[test]
fn integration_remote_image_is_not_uploaded() {
    let (_dir, doc_path) = workspace("![logo](https://example.com/logo.png)\n", &[]);
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();

    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(&CallContext::background(), &doc_path, &new_doc())
        .expect("import should succeed");

    assert_eq!(report.placed, 1);
    assert_eq!(*objects.uploads.borrow(), 0);
    assert_eq!(
        docs.render("doc-note"),
        "[img:https://example.com/logo.png]\n\n"
    );
}

#[test]
fn integration_no_images_skips_image_stages() {
    let (_dir, doc_path) = workspace("Just text.\n", &[]);
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();

    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(&CallContext::background(), &doc_path, &new_doc())
        .expect("import should succeed");

    assert_eq!(report.placed, 0);
    assert_eq!(*docs.batches.borrow(), 0);
    assert_eq!(docs.render("doc-note"), "Just text.\n\n");
}

#[test]
fn integration_partial_success_leaves_placeholder() {
    let (_dir, doc_path) = workspace(
        "![ok](img/a.png) and ![gone](img/missing.png) and ![evil](../outside.png)",
        &["img/a.png"],
    );
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();

    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(&CallContext::background(), &doc_path, &new_doc())
        .expect("partial import should succeed");

    assert_eq!(report.placed, 1);
    let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert_eq!(report.skipped[1].reference, "../outside.png");
    assert_eq!(
        docs.render("doc-note"),
        "[img:https://store.test/obj-1] and <<IMG_1>> and <<IMG_2>>\n"
    );
}

#[test]
fn integration_strict_policy_aborts_and_cleans_up() {
    let (_dir, doc_path) = workspace(
        "![ok](img/a.png) ![bad](img/b.svg)",
        &["img/a.png", "img/b.svg"],
    );
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();
    let options = ImportOptions {
        missing_images: MissingImagePolicy::Fail,
        ..Default::default()
    };

    let result = Importer::new(&docs, &objects, options).import_file(
        &CallContext::background(),
        &doc_path,
        &new_doc(),
    );

    assert!(matches!(result, Err(ImportError::UnsupportedFormat { .. })));
    assert_eq!(*objects.uploads.borrow(), 1);
    assert_eq!(objects.live(), 0);
    assert_eq!(*docs.batches.borrow(), 0);
}

#[test]
fn integration_keep_uploads() {
    let (_dir, doc_path) = workspace("![a](img/a.png)", &["img/a.png"]);
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();
    let options = ImportOptions {
        keep_uploads: true,
        ..Default::default()
    };

    let report = Importer::new(&docs, &objects, options)
        .import_file(&CallContext::background(), &doc_path, &new_doc())
        .expect("import should succeed");

    assert_eq!(report.retained_uploads, vec!["obj-1".to_string()]);
    assert_eq!(objects.live(), 1);
}

#[test]
fn integration_batch_failure_still_cleans_up() {
    let (_dir, doc_path) = workspace("![a](img/a.png)", &["img/a.png"]);
    let docs = FakeDocs {
        fail_batch: true,
        ..Default::default()
    };
    let objects = FakeObjects::default();

    let result = Importer::new(&docs, &objects, ImportOptions::default()).import_file(
        &CallContext::background(),
        &doc_path,
        &new_doc(),
    );

    assert!(matches!(
        result,
        Err(ImportError::Store(StoreError::Api { status: 500, .. }))
    ));
    assert_eq!(objects.live(), 0);
}

#[test]
fn integration_append_to_existing_document() {
    let (_dir, doc_path) = workspace("more ![a](img/a.png)", &["img/a.png"]);
    let docs = FakeDocs::with_existing("existing", "Old text. \n");
    let objects = FakeObjects::default();

    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(
            &CallContext::background(),
            &doc_path,
            &DocumentTarget::Existing {
                id: "existing".to_string(),
            },
        )
        .expect("import should succeed");

    assert_eq!(report.document_id, "existing");
    assert_eq!(
        docs.render("existing"),
        "Old text. more [img:https://store.test/obj-1]\n"
    );
}

#[test]
fn integration_append_ignores_leftover_placeholders() {
    let (_dir, doc_path) = workspace("new ![a](img/a.png)", &["img/a.png"]);
    let docs = FakeDocs::with_existing("existing", "Old <<IMG_0>> left over. \n");
    let objects = FakeObjects::default();

    let report = Importer::new(&docs, &objects, ImportOptions::default())
        .import_file(
            &CallContext::background(),
            &doc_path,
            &DocumentTarget::Existing {
                id: "existing".to_string(),
            },
        )
        .expect("import should succeed");

    assert_eq!(report.placed, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(
        docs.render("existing"),
        "Old <<IMG_0>> left over. new [img:https://store.test/obj-1]\n"
    );
}

#[test]
fn integration_cancelled_context_fails_before_writing() {
    let (_dir, doc_path) = workspace("![a](img/a.png)", &["img/a.png"]);
    let docs = FakeDocs::default();
    let objects = FakeObjects::default();

    let ctx = CallContext::background();
    ctx.cancel();
    let result = Importer::new(&docs, &objects, ImportOptions::default()).import_file(
        &ctx,
        &doc_path,
        &new_doc(),
    );

    assert!(matches!(result, Err(ImportError::Store(StoreError::Cancelled))));
    assert!(docs.buffers.borrow().is_empty());
}

#[test]
fn integration_ascending_replay_is_rejected() {
    // The same pairs applied low-to-high: the first pair shrinks the buffer,
    // so the second delete points past its end and is rejected.
    let mut buffer: Vec<Slot> = "ab<<IMG_0>>cd<<IMG_1>>ef\n"
        .chars()
        .map(Slot::Char)
        .collect();
    let ascending = [
        EditOperation::DeleteRange { start: 3, end: 12 },
        EditOperation::InsertImage {
            url: "0".into(),
            at_index: 3,
        },
        EditOperation::DeleteRange { start: 14, end: 23 },
        EditOperation::InsertImage {
            url: "1".into(),
            at_index: 14,
        },
    ];
    let outcome: Result<(), StoreError> = ascending
        .iter()
        .try_for_each(|op| FakeDocs::apply(&mut buffer, op));

    let rendered: String = buffer
        .iter()
        .map(|slot| match slot {
            Slot::Char(c) => c.to_string(),
            Slot::Image(url) => format!("[img:{}]", url),
        })
        .collect();
    assert!(matches!(
        outcome,
        Err(StoreError::Api { status: 400, ref message }) if message == "bad range 14..23"
    ));
    assert_eq!(rendered, "ab[img:0]cd<<IMG_1>>ef\n");
}
