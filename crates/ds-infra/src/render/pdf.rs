//! First-page PDF previews through pdfium.
//!
//! Compiled with the `pdf` feature. Binding needs the pdfium shared library,
//! either next to the executable or installed system-wide.

use anyhow::{anyhow, Context, Result};
use ds_core::ports::{PdfPreview, PdfRendererPort};
use pdfium_render::prelude::*;

pub struct PdfiumRenderer {
    pdfium: Pdfium,
}

impl PdfiumRenderer {
    pub fn new() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| anyhow!("bind pdfium library: {e:?}"))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfRendererPort for PdfiumRenderer {
    fn render_first_page(&self, pdf_bytes: &[u8], max_edge: u32) -> Result<Option<PdfPreview>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| anyhow!("load pdf: {e:?}"))?;

        let title = document
            .metadata()
            .get(PdfDocumentMetadataTagType::Title)
            .map(|tag| tag.value().trim().to_string())
            .filter(|t| !t.is_empty());

        if document.pages().len() == 0 {
            return Ok(None);
        }
        let page = document
            .pages()
            .first()
            .map_err(|e| anyhow!("open first page: {e:?}"))?;

        let edge = i32::try_from(max_edge).context("preview edge exceeds i32 range")?;
        let config = if page.width().value >= page.height().value {
            PdfRenderConfig::new().set_target_width(edge)
        } else {
            PdfRenderConfig::new().set_target_height(edge)
        };
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| anyhow!("render first page: {e:?}"))?;

        Ok(Some(PdfPreview {
            rgba: bitmap.as_rgba_bytes(),
            width: u32::try_from(bitmap.width()).context("bitmap width")?,
            height: u32::try_from(bitmap.height()).context("bitmap height")?,
            title,
        }))
    }
}
