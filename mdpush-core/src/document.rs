//! Read-only view of a remote structured document and placeholder location
//!
//! A remote document is one linear buffer. Every text run carries the
//! absolute index of its first character, counted in UTF-16 code units
//! from the start of the buffer.

use std::collections::HashMap;

use crate::image::placeholder_token;

/// A materialised remote document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentModel {
    pub id: String,
    /// Body content; empty when the document has no body
    pub content: Vec<StructuralElement>,
}

/// Top-level or table-cell content node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralElement {
    Paragraph(Paragraph),
    Table(Table),
    SectionBreak,
    /// Anything else (tables of contents, ...), never searched
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParagraphElement {
    TextRun(TextRun),
    /// Inline objects, page breaks, equations and the like
    Other,
}

/// A run of text at an absolute position in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub start_index: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub content: Vec<StructuralElement>,
}

/// Half-open `[start, end)` range of absolute document offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OffsetRange {
    pub start: usize,
    pub end: usize,
}

impl OffsetRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl TextRun {
    pub fn new(start_index: usize, content: impl Into<String>) -> Self {
        Self {
            start_index,
            content: content.into(),
        }
    }
}

impl Paragraph {
    /// Paragraph made of text runs only
    pub fn from_runs(runs: impl IntoIterator<Item = TextRun>) -> Self {
        Self {
            elements: runs.into_iter().map(ParagraphElement::TextRun).collect(),
        }
    }
}

impl DocumentModel {
    pub fn new(id: impl Into<String>, content: Vec<StructuralElement>) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }

    /// All text runs in document order, descending into table cells
    pub fn text_runs(&self) -> Vec<&TextRun> {
        let mut runs = Vec::new();
        collect_runs(&self.content, &mut runs);
        runs
    }

    /// Absolute index just past the last text run, or 1 for an empty body
    pub fn end_index(&self) -> usize {
        self.text_runs()
            .last()
            .map_or(1, |run| run.start_index + utf16_len(&run.content))
    }
}

fn collect_runs<'a>(elements: &'a [StructuralElement], runs: &mut Vec<&'a TextRun>) {
    for element in elements {
        match element {
            StructuralElement::Paragraph(paragraph) => {
                for item in &paragraph.elements {
                    if let ParagraphElement::TextRun(run) = item {
                        runs.push(run);
                    }
                }
            }
            StructuralElement::Table(table) => {
                for row in &table.rows {
                    for cell in &row.cells {
                        collect_runs(&cell.content, runs);
                    }
                }
            }
            StructuralElement::SectionBreak | StructuralElement::Other => {}
        }
    }
}

/// Number of UTF-16 code units in `text`
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte offset of the first char boundary at or after `units` UTF-16 code units
fn byte_offset_at(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (byte_pos, ch) in text.char_indices() {
        if seen >= units {
            return byte_pos;
        }
        seen += ch.len_utf16();
    }
    text.len()
}

/// Find the placeholders `<<IMG_0>>` .. `<<IMG_{count-1}>>` in `document`.
///
/// Each token maps to the absolute range of its first occurrence. Tokens
/// that do not occur are absent from the map.
pub fn locate(document: &DocumentModel, count: usize) -> HashMap<String, OffsetRange> {
    locate_from(document, count, 0)
}

/// Like [`locate`], but only matches starting at or after absolute offset `from`.
///
/// Text before `from` predates this import; tokens left there by an earlier
/// import are ignored.
pub fn locate_from(
    document: &DocumentModel,
    count: usize,
    from: usize,
) -> HashMap<String, OffsetRange> {
    let mut found = HashMap::new();
    if count == 0 || document.content.is_empty() {
        return found;
    }

    let mut outstanding: Vec<String> = (0..count).map(placeholder_token).collect();

    for run in document.text_runs() {
        if outstanding.is_empty() {
            break;
        }
        if run.start_index + utf16_len(&run.content) <= from {
            continue;
        }
        let skip = byte_offset_at(&run.content, from.saturating_sub(run.start_index));
        let searched = &run.content[skip..];

        outstanding.retain(|token| {
            let Some(pos) = searched.find(token.as_str()) else {
                return true;
            };
            let start = run.start_index + utf16_len(&run.content[..skip + pos]);
            let range = OffsetRange::new(start, start + utf16_len(token));
            log::debug!("Located {} at {}..{}", token, range.start, range.end);
            found.insert(token.clone(), range);
            false
        });
    }

    found
}
