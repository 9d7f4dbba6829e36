//! JSON shapes of the Google Docs and Drive APIs
//!
//! Only the fields the importer reads or writes are modelled. Response
//! types convert into the service-neutral model in `mdpush_core::document`.

use mdpush_core::document::{self, DocumentModel};
use mdpush_core::EditOperation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    #[serde(default)]
    pub body: Option<Body>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

/// Exactly one of the optional members is set by the API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    #[serde(default)]
    pub paragraph: Option<Paragraph>,
    #[serde(default)]
    pub table: Option<Table>,
    #[serde(default)]
    pub section_break: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    // Omitted by the API when zero
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

impl From<Document> for DocumentModel {
    fn from(doc: Document) -> Self {
        let content = doc
            .body
            .map(|b| b.content.into_iter().map(Into::into).collect())
            .unwrap_or_default();
        DocumentModel::new(doc.document_id, content)
    }
}

impl From<StructuralElement> for document::StructuralElement {
    fn from(element: StructuralElement) -> Self {
        if let Some(paragraph) = element.paragraph {
            return Self::Paragraph(document::Paragraph {
                elements: paragraph.elements.into_iter().map(Into::into).collect(),
            });
        }
        if let Some(table) = element.table {
            return Self::Table(table.into());
        }
        if element.section_break.is_some() {
            return Self::SectionBreak;
        }
        Self::Other
    }
}

impl From<ParagraphElement> for document::ParagraphElement {
    fn from(element: ParagraphElement) -> Self {
        match element.text_run {
            Some(run) => Self::TextRun(document::TextRun::new(element.start_index, run.content)),
            None => Self::Other,
        }
    }
}

impl From<Table> for document::Table {
    fn from(table: Table) -> Self {
        Self {
            rows: table
                .table_rows
                .into_iter()
                .map(|row| document::TableRow {
                    cells: row
                        .table_cells
                        .into_iter()
                        .map(|cell| document::TableCell {
                            content: cell.content.into_iter().map(Into::into).collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Body of `documents.create`
#[derive(Debug, Serialize)]
pub struct CreateDocument<'a> {
    pub title: &'a str,
}

/// Body of `documents.batchUpdate`
#[derive(Debug, Serialize)]
pub struct BatchUpdate {
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    InsertText(InsertText),
    DeleteContentRange(DeleteContentRange),
    InsertInlineImage(InsertInlineImage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertText {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteContentRange {
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertInlineImage {
    pub uri: String,
    pub location: Location,
}

impl Request {
    pub fn insert_text(index: usize, text: impl Into<String>) -> Self {
        Self::InsertText(InsertText {
            location: Location { index },
            text: text.into(),
        })
    }
}

impl From<&EditOperation> for Request {
    fn from(op: &EditOperation) -> Self {
        match op {
            EditOperation::DeleteRange { start, end } => {
                Self::DeleteContentRange(DeleteContentRange {
                    range: Range {
                        start_index: *start,
                        end_index: *end,
                    },
                })
            }
            EditOperation::InsertImage { url, at_index } => {
                Self::InsertInlineImage(InsertInlineImage {
                    uri: url.clone(),
                    location: Location { index: *at_index },
                })
            }
        }
    }
}

/// Drive file metadata as returned with `fields=id,webContentLink`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub web_content_link: Option<String>,
}

/// Body of `permissions.create`
#[derive(Debug, Serialize)]
pub struct Permission<'a> {
    pub role: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
}

/// Error envelope shared by Google APIs
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
