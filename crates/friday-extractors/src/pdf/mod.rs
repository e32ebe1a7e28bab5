//! PDF ingestion pipeline.
//!
//! A run is strictly sequential and all-or-nothing:
//!
//! 1. resolve the input path (fails with `FileNotFound` before anything is written)
//! 2. allocate a fresh id and create `<library>/<id>/assets`
//! 3. extract page text (progress 0..=40)
//! 4. extract embedded images (progress 40..=70)
//! 5. write `<title>.md` (progress 70)
//! 6. report completion (progress 100) and return the resource
//!
//! Any failure aborts the run. Files already written stay on disk. An image
//! stream that cannot be decoded is not a failure; it is written raw as `bin`.

mod images;
mod layout;
mod markdown;
mod text;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use lopdf::Document;
use tracing::info;
use uuid::Uuid;

use friday_core::{
    band_percent, ProgressSink, ProgressStage, Resource, ResourceType, SidecarContext,
    SidecarError, SidecarResult,
};

use crate::path::{file_title, resolve_input_file};
use crate::Ingestor;

pub use images::{page_images, PageImage, IMAGES_BAND};
pub use layout::{asset_file_name, ResourceLayout, ASSETS_DIR};
pub use markdown::{MarkdownDocument, IMAGES_HEADING};
pub use text::{extract_text, page_heading, TEXT_BAND};

/// Progress checkpoint after the markdown file is written.
pub const MARKDOWN_PERCENT: u32 = 70;

/// PDF ingestor writing into the context's library root.
#[derive(Clone)]
pub struct PdfIngestor {
    ctx: SidecarContext,
}

impl PdfIngestor {
    pub fn new(ctx: SidecarContext) -> Self {
        Self { ctx }
    }

    /// Run the whole pipeline on the current thread.
    pub fn ingest_blocking(&self, input: &str) -> SidecarResult<Resource> {
        PdfPipeline {
            library_root: self.ctx.library_root(),
            progress: self.ctx.progress().as_ref(),
        }
        .run(input)
    }
}

#[async_trait]
impl Ingestor for PdfIngestor {
    async fn ingest(&self, input: &str) -> SidecarResult<Resource> {
        let this = self.clone();
        let input = input.to_string();
        tokio::task::spawn_blocking(move || this.ingest_blocking(&input))
            .await
            .map_err(|e| SidecarError::Internal(format!("PDF ingestion task failed: {}", e)))?
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::Pdf
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

struct PdfPipeline<'a> {
    library_root: &'a Path,
    progress: &'a dyn ProgressSink,
}

impl PdfPipeline<'_> {
    fn run(&self, input: &str) -> SidecarResult<Resource> {
        let path = resolve_input_file(input)?;
        let title = file_title(&path, "document");

        let id = Uuid::new_v4();
        let layout = ResourceLayout::create(self.library_root, &id.to_string())?;
        info!(%id, path = %path.display(), "Ingesting PDF");

        let doc = Document::load(&path).map_err(|e| {
            SidecarError::extraction(format!("cannot open {}: {}", path.display(), e))
        })?;

        let body = extract_text(&doc, self.progress)?;
        let assets = self.extract_assets(&doc, &layout)?;

        let asset_names: Vec<String> = assets
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        let markdown = MarkdownDocument {
            title: &title,
            source: input,
            processed_at: Utc::now(),
            body: &body,
            images: &asset_names,
        }
        .render();
        let md_path = layout.markdown_path(&title);
        std::fs::write(&md_path, markdown)?;
        self.progress.report(
            ProgressStage::Markdown,
            MARKDOWN_PERCENT,
            "Markdown document written",
        );

        let resource = Resource::new(id, ResourceType::Pdf, title, input)
            .with_md_path(md_path.to_string_lossy())
            .with_assets(
                assets
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect(),
            );
        self.progress
            .report(ProgressStage::Complete, 100, "PDF ingestion complete");
        info!(%id, assets = resource.assets.len(), "PDF ingested");

        Ok(resource)
    }

    /// Write every embedded image to the assets directory, page by page.
    fn extract_assets(
        &self,
        doc: &Document,
        layout: &ResourceLayout,
    ) -> SidecarResult<Vec<PathBuf>> {
        let pages = doc.get_pages();
        let total = pages.len();
        let (start, width) = IMAGES_BAND;
        let mut written = Vec::new();

        for (done, (page_number, page_id)) in pages.iter().enumerate() {
            for (index, image) in page_images(doc, *page_id)?.into_iter().enumerate() {
                let path = layout.asset_path(*page_number, index + 1, image.extension);
                std::fs::write(&path, &image.bytes)?;
                written.push(path);
            }

            self.progress.report(
                ProgressStage::Images,
                band_percent(start, width, done + 1, total),
                &format!("Images extracted from page {}/{}", done + 1, total),
            );
        }

        if total == 0 {
            self.progress
                .report(ProgressStage::Images, start + width, "No pages to scan for images");
        }

        Ok(written)
    }
}
