//! Edit scripts that swap placeholder text for images

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::OffsetRange;
use crate::error::ImportError;
use crate::image::ImageReference;

/// One mutation of the remote document buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    DeleteRange { start: usize, end: usize },
    InsertImage { url: String, at_index: usize },
}

/// What to do with an image whose placeholder or URL is missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingImagePolicy {
    /// Leave the placeholder text in place and carry on with the others
    #[default]
    Skip,
    /// Refuse to build a script unless every image can be placed
    Fail,
}

/// An edit script and the images it leaves out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    pub operations: Vec<EditOperation>,
    /// Indices of images with no located placeholder or no URL
    pub skipped: Vec<usize>,
}

/// Build the delete/insert pairs replacing each placeholder with its image.
///
/// Pairs are emitted from the highest start offset down. Each edit only
/// shifts text above its own offset, so the ranges of the pairs still to
/// come stay valid while the script is replayed in order.
pub fn build(
    ranges: &HashMap<String, OffsetRange>,
    images: &[ImageReference],
    urls: &HashMap<usize, String>,
    policy: MissingImagePolicy,
) -> Result<EditScript, ImportError> {
    let mut placements = Vec::with_capacity(images.len());
    let mut skipped = Vec::new();

    for image in images {
        match (ranges.get(&image.placeholder()), urls.get(&image.index)) {
            (Some(range), Some(url)) => placements.push((*range, url)),
            (range, url) => {
                log::debug!(
                    "Image {} not placed (placeholder located: {}, url resolved: {})",
                    image.index,
                    range.is_some(),
                    url.is_some()
                );
                skipped.push(image.index);
            }
        }
    }

    if policy == MissingImagePolicy::Fail && !skipped.is_empty() {
        return Err(ImportError::Unplaced { indices: skipped });
    }

    placements.sort_by(|a, b| b.0.start.cmp(&a.0.start));

    let mut operations = Vec::with_capacity(placements.len() * 2);
    for (range, url) in placements {
        operations.push(EditOperation::DeleteRange {
            start: range.start,
            end: range.end,
        });
        operations.push(EditOperation::InsertImage {
            url: url.clone(),
            at_index: range.start,
        });
    }

    Ok(EditScript {
        operations,
        skipped,
    })
}
