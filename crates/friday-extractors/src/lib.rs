//! Ingestion pipelines for the Friday sidecar.
//!
//! Each pipeline turns one input (a local PDF, a video URL, an audio file)
//! into a [`Resource`] record. The PDF pipeline does the real work: page text,
//! embedded images and a markdown document written under the library root.
//!
//! # Example
//!
//! ```no_run
//! use friday_core::{SidecarConfig, SidecarContext};
//! use friday_extractors::{Ingestor, PdfIngestor};
//!
//! # async fn run() -> friday_core::SidecarResult<()> {
//! let ctx = SidecarContext::new(SidecarConfig::default())?;
//! let resource = PdfIngestor::new(ctx).ingest("papers/attention.pdf").await?;
//! println!("{}", resource.md_path.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod media;
pub mod path;
pub mod pdf;

use async_trait::async_trait;
use friday_core::{Resource, ResourceType, SidecarResult};

pub use media::{video_title, AudioIngestor, VideoIngestor};
pub use path::{file_title, normalize_path, resolve_input_file};
pub use pdf::PdfIngestor;

/// A pipeline that turns one input into a resource record.
#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Ingest `input` (a path or URL) and return the new resource.
    async fn ingest(&self, input: &str) -> SidecarResult<Resource>;

    /// Resource type this ingestor produces.
    fn resource_type(&self) -> ResourceType;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
