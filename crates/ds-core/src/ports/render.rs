use anyhow::Result;

use crate::content::ContentMode;
use crate::ports::classifier::RenderedIcon;

/// Decodes and scales encoded images into icon pixels.
pub trait IconRendererPort: Send + Sync {
    /// Pixel size of an encoded image.
    fn dimensions(&self, image_bytes: &[u8]) -> Result<(u32, u32)>;

    fn render(&self, image_bytes: &[u8], mode: ContentMode) -> Result<RenderedIcon>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPreview {
    /// RGBA8 pixels of the first page.
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Document "Title" metadata, when present and non-empty.
    pub title: Option<String>,
}

/// Renders the first page of a PDF.
pub trait PdfRendererPort: Send + Sync {
    /// `Ok(None)` when the document has no pages.
    fn render_first_page(&self, pdf_bytes: &[u8], max_edge: u32) -> Result<Option<PdfPreview>>;
}
