//! Image references in Markdown source and their placeholder tokens

use regex::Regex;
use std::sync::OnceLock;

/// An image found in the Markdown source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Zero-based position in source order
    pub index: usize,
    /// Alt text
    pub alt: String,
    /// Image source (path or URL) as written
    pub original_ref: String,
}

impl ImageReference {
    /// Create a new image reference
    pub fn new(index: usize, alt: impl Into<String>, original_ref: impl Into<String>) -> Self {
        Self {
            index,
            alt: alt.into(),
            original_ref: original_ref.into(),
        }
    }

    /// The token standing in for this image in the uploaded text
    pub fn placeholder(&self) -> String {
        placeholder_token(self.index)
    }

    /// Whether the reference is an http(s) URL rather than a local file
    pub fn is_remote(&self) -> bool {
        self.original_ref.starts_with("http://") || self.original_ref.starts_with("https://")
    }
}

/// Placeholder token for the image at `index`
pub fn placeholder_token(index: usize) -> String {
    format!("<<IMG_{index}>>")
}

/// Matches `![alt](ref)`, `![alt](<ref with spaces>)`, each with an optional
/// `"title"`, `'title'` or `(title)`.
fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"!\[([^\]]*)\]\(\s*(?:<([^>\n]*)>|([^\s)]+))(?:\s+(?:"[^"]*"|'[^']*'|\([^)]*\)))?\s*\)"#,
        )
        .expect("image pattern is valid")
    })
}

/// Replace every image in `markdown` with its placeholder token.
///
/// Returns the cleaned text and the images in source order. Text outside
/// image markup is copied through untouched.
pub fn extract(markdown: &str) -> (String, Vec<ImageReference>) {
    let mut images = Vec::new();
    let mut cleaned = String::with_capacity(markdown.len());
    let mut last = 0;

    for caps in image_pattern().captures_iter(markdown) {
        let Some(whole) = caps.get(0) else { continue };
        let alt = caps.get(1).map_or("", |m| m.as_str());
        let reference = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());

        let image = ImageReference::new(images.len(), alt, reference);

        cleaned.push_str(&markdown[last..whole.start()]);
        cleaned.push_str(&image.placeholder());
        last = whole.end();

        images.push(image);
    }

    cleaned.push_str(&markdown[last..]);
    (cleaned, images)
}
