//! services/api/src/adapters/pdf.rs
//!
//! This module contains the adapter for PDF page rasterization.
//! It implements the `PageRasterizer` port from the `core` crate.
//! pdfium is not async-safe, so all rendering happens in `spawn_blocking`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use pdfium_render::prelude::*;
use sintgpt_core::ports::{PageRasterizer, PortError, PortResult};
use tracing::debug;

/// Upscaling factor applied to every page before extraction; higher
/// resolution noticeably improves handwriting transcription.
const RENDER_SCALE: f32 = 2.0;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `PageRasterizer` port using pdfium.
#[derive(Clone, Default)]
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Creates a new `PdfiumRasterizer`.
    pub fn new() -> Self {
        Self
    }
}

fn render_all_pages(path: &Path) -> PortResult<Vec<Vec<u8>>> {
    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| PortError::Unexpected(format!("failed to bind pdfium: {}", e)))?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| PortError::InvalidInput(format!("failed to open PDF: {}", e)))?;

    let page_count = document.pages().len();
    debug!("Rasterizing {} PDF pages", page_count);

    let config = PdfRenderConfig::new().scale_page_by_factor(RENDER_SCALE);

    let mut rendered = Vec::with_capacity(page_count as usize);
    for page in document.pages().iter() {
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PortError::Unexpected(format!("failed to render PDF page: {}", e)))?;
        let image = bitmap.as_image();

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| PortError::Unexpected(format!("failed to encode page PNG: {}", e)))?;
        rendered.push(png);
    }

    Ok(rendered)
}

//=========================================================================================
// `PageRasterizer` Trait Implementation
//=========================================================================================

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    /// Renders every page of the PDF at `path` to a PNG, in page order.
    async fn rasterize_pdf(&self, path: &Path) -> PortResult<Vec<Vec<u8>>> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || render_all_pages(&path))
            .await
            .map_err(|e| PortError::Unexpected(format!("rasterization task failed: {}", e)))?
    }
}
