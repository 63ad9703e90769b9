// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link content and the content-sizing collaborator.
//!
//! A link only needs to know how big its content is. How the size is
//! obtained (image decode, text layout, a real DOM measurement) belongs to a
//! [`ContentProvider`], which the scene owns and consults whenever a link's
//! content is set.

use crate::math::Vector2;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// Approximate glyph box used to size text content
const GLYPH_WIDTH: f32 = 8.0;
const LINE_HEIGHT: f32 = 16.0;

/// Raw link payload as it comes from a document or a remote structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Base64 encoded payload
    pub data: String,
    /// MIME type of the decoded payload
    pub mime_type: String,
}

impl Content {
    /// Create new content from base64 data
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Create content from plain text (encodes it as base64)
    pub fn from_text(text: &str) -> Self {
        Self::new(
            base64::engine::general_purpose::STANDARD.encode(text),
            "text/plain",
        )
    }

    /// Decode the base64 payload
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.data.trim())
    }

    /// Check if the payload is an image
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Content object attached to a link
pub trait LinkContent: fmt::Debug {
    /// Size the content occupies on screen
    fn size(&self) -> Vector2;

    /// The payload this content was built from
    fn content(&self) -> &Content;
}

/// Builds [`LinkContent`] objects for raw payloads
pub trait ContentProvider: fmt::Debug {
    /// Create the content object for a payload
    fn provide(&self, content: &Content) -> Box<dyn LinkContent>;
}

/// Content with a precomputed size
#[derive(Debug, Clone)]
pub struct SizedContent {
    content: Content,
    size: Vector2,
}

impl SizedContent {
    /// Wrap a payload with a known size
    pub fn new(content: Content, size: Vector2) -> Self {
        Self { content, size }
    }
}

impl LinkContent for SizedContent {
    fn size(&self) -> Vector2 {
        self.size
    }

    fn content(&self) -> &Content {
        &self.content
    }
}

/// Error while measuring a payload
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Payload is not valid base64
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Image header could not be read
    #[error("Unreadable image: {0}")]
    Image(#[from] image::ImageError),

    /// I/O failure while sniffing the image format
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default provider that measures payloads without a display.
///
/// Images are sized from their header, anything else is laid out as text
/// with a fixed glyph box. Like a measured box, both dimensions get one
/// extra unit. Payloads that cannot be measured fall back to `fallback`.
#[derive(Debug, Clone)]
pub struct MeasuredContentProvider {
    /// Size used when a payload cannot be measured
    pub fallback: Vector2,
}

impl MeasuredContentProvider {
    /// Create a provider with the given fallback size
    pub fn new(fallback: Vector2) -> Self {
        Self { fallback }
    }

    /// Measure a payload
    pub fn measure(&self, content: &Content) -> Result<Vector2, ContentError> {
        let bytes = content.decode()?;
        let (width, height) = if content.is_image() {
            let (w, h) = image::ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()?
                .into_dimensions()?;
            (w as f32, h as f32)
        } else {
            measure_text(&String::from_utf8_lossy(&bytes))
        };
        Ok(Vector2::new(width + 1.0, height + 1.0))
    }
}

impl Default for MeasuredContentProvider {
    fn default() -> Self {
        Self::new(Vector2::splat(crate::object::DEFAULT_LINK_SIZE))
    }
}

impl ContentProvider for MeasuredContentProvider {
    fn provide(&self, content: &Content) -> Box<dyn LinkContent> {
        let size = self.measure(content).unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to measure {} content: {}. Using fallback size.",
                content.mime_type,
                e
            );
            self.fallback
        });
        Box::new(SizedContent::new(content.clone(), size))
    }
}

/// Size of text laid out with the fixed glyph box, markup tags stripped
fn measure_text(text: &str) -> (f32, f32) {
    let mut lines = 0usize;
    let mut widest = 0usize;
    for line in text.lines() {
        lines += 1;
        widest = widest.max(strip_tags(line).chars().count());
    }
    (widest as f32 * GLYPH_WIDTH, lines.max(1) as f32 * LINE_HEIGHT)
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
