//! Google Drive as an [`ObjectStore`] for staging images

use mdpush_core::store::UploadedObject;
use mdpush_core::{CallContext, ObjectStore, StoreError};
use reqwest::header::CONTENT_TYPE;

use crate::client::GoogleClient;
use crate::wire::{DriveFile, Permission};

pub struct GoogleDrive {
    client: GoogleClient,
}

impl GoogleDrive {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }

    fn file_url(&self, object_id: &str) -> String {
        format!("{}/files/{}", self.client.drive_endpoint, object_id)
    }
}

impl ObjectStore for GoogleDrive {
    fn upload(
        &self,
        ctx: &CallContext,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<UploadedObject, StoreError> {
        let url = format!(
            "{}/files?uploadType=media&fields=id,webContentLink",
            self.client.upload_endpoint
        );
        let file: DriveFile = self.client.send_json(
            ctx,
            self.client
                .http()
                .post(url)
                .header(CONTENT_TYPE, mime_type)
                .body(bytes),
        )?;

        if file.id.is_empty() {
            return Err(StoreError::Decode("upload response has no file id".to_string()));
        }
        Ok(UploadedObject {
            id: file.id,
            url: file.web_content_link,
        })
    }

    fn set_public_readable(&self, ctx: &CallContext, object_id: &str) -> Result<(), StoreError> {
        let url = format!("{}/permissions", self.file_url(object_id));
        let permission = Permission {
            role: "reader",
            kind: "anyone",
        };
        self.client
            .send(ctx, self.client.http().post(url).json(&permission))?;
        Ok(())
    }

    fn get_public_url(&self, ctx: &CallContext, object_id: &str) -> Result<String, StoreError> {
        let url = format!("{}?fields=webContentLink", self.file_url(object_id));
        let file: DriveFile = self.client.send_json(ctx, self.client.http().get(url))?;
        Ok(file.web_content_link.unwrap_or_default())
    }

    fn delete(&self, ctx: &CallContext, object_id: &str) -> Result<(), StoreError> {
        self.client
            .send(ctx, self.client.http().delete(self.file_url(object_id)))?;
        Ok(())
    }
}
