//! Google Docs as a [`DocumentStore`]

use mdpush_core::{
    CallContext, DocumentModel, DocumentStore, DocumentTarget, EditOperation, SeededDocument,
    StoreError,
};

use crate::client::GoogleClient;
use crate::wire::{BatchUpdate, CreateDocument, Document, Request};

pub struct GoogleDocs {
    client: GoogleClient,
}

impl GoogleDocs {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/documents/{}", self.client.docs_endpoint, document_id)
    }

    fn send_requests(
        &self,
        ctx: &CallContext,
        document_id: &str,
        requests: Vec<Request>,
    ) -> Result<(), StoreError> {
        let url = format!("{}:batchUpdate", self.document_url(document_id));
        let body = BatchUpdate { requests };
        self.client
            .send(ctx, self.client.http().post(url).json(&body))?;
        Ok(())
    }
}

/// Where appended text goes: just before the body's final newline
fn append_index(model: &DocumentModel) -> usize {
    model.end_index().saturating_sub(1).max(1)
}

/// Report a failed text insert; a freshly created document is left behind empty
fn seed_failed(document_id: &str, created: bool, error: StoreError) -> StoreError {
    if !created {
        return error;
    }
    log::warn!(
        "Document {} was created but writing its text failed: {}",
        document_id,
        error
    );
    match error {
        StoreError::Api { status, message } => StoreError::Api {
            status,
            message: format!("{} (empty document {} was left behind)", message, document_id),
        },
        other => other,
    }
}

impl DocumentStore for GoogleDocs {
    fn create_or_get_document(
        &self,
        ctx: &CallContext,
        target: &DocumentTarget,
        initial_text: &str,
    ) -> Result<SeededDocument, StoreError> {
        let (seeded, created) = match target {
            DocumentTarget::New { title } => {
                let url = format!("{}/documents", self.client.docs_endpoint);
                let created: Document = self.client.send_json(
                    ctx,
                    self.client.http().post(url).json(&CreateDocument { title }),
                )?;
                log::info!("Created document {}", created.document_id);
                let seeded = SeededDocument {
                    id: created.document_id,
                    start_index: 1,
                };
                (seeded, true)
            }
            DocumentTarget::Existing { id } => {
                let model = self.get_document_model(ctx, id)?;
                let seeded = SeededDocument {
                    id: id.clone(),
                    start_index: append_index(&model),
                };
                (seeded, false)
            }
        };

        if !initial_text.is_empty() {
            let requests = vec![Request::insert_text(seeded.start_index, initial_text)];
            self.send_requests(ctx, &seeded.id, requests)
                .map_err(|e| seed_failed(&seeded.id, created, e))?;
        }
        Ok(seeded)
    }

    fn get_document_model(
        &self,
        ctx: &CallContext,
        document_id: &str,
    ) -> Result<DocumentModel, StoreError> {
        let document: Document = self
            .client
            .send_json(ctx, self.client.http().get(self.document_url(document_id)))?;
        Ok(document.into())
    }

    fn batch_apply(
        &self,
        ctx: &CallContext,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), StoreError> {
        log::debug!(
            "Applying {} operation(s) to {}",
            operations.len(),
            document_id
        );
        self.send_requests(ctx, document_id, operations.iter().map(Request::from).collect())
    }
}
