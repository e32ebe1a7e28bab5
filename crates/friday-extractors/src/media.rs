//! Video and audio ingestors.
//!
//! Neither pipeline decodes media yet. Both return a record with the same
//! shape as a PDF resource so hosts can already store and display them;
//! `md_path` stays empty and `assets` stays empty until transcription lands.

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use friday_core::{ProgressStage, Resource, ResourceType, SidecarContext, SidecarResult};

use crate::path::{file_title, normalize_path};
use crate::Ingestor;

/// Ingestor for video URLs.
#[derive(Clone)]
pub struct VideoIngestor {
    ctx: SidecarContext,
}

impl VideoIngestor {
    pub fn new(ctx: SidecarContext) -> Self {
        Self { ctx }
    }
}

/// Title for a video: the last non-empty URL path segment, else the input.
pub fn video_title(input: &str) -> String {
    let trimmed = input.trim();
    Url::parse(trimmed)
        .ok()
        .and_then(|url| {
            url.path_segments().and_then(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .last()
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| trimmed.to_string())
}

#[async_trait]
impl Ingestor for VideoIngestor {
    async fn ingest(&self, input: &str) -> SidecarResult<Resource> {
        info!(url = input, "Processing video");
        warn!("Video transcription is not available; returning a bare record");

        let resource = Resource::new(
            Uuid::new_v4(),
            ResourceType::Video,
            video_title(input),
            input,
        );
        self.ctx
            .progress()
            .report(ProgressStage::Complete, 100, "Video record created");
        Ok(resource)
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::Video
    }

    fn name(&self) -> &str {
        "video"
    }
}

/// Ingestor for local audio files.
#[derive(Clone)]
pub struct AudioIngestor {
    ctx: SidecarContext,
}

impl AudioIngestor {
    pub fn new(ctx: SidecarContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Ingestor for AudioIngestor {
    async fn ingest(&self, input: &str) -> SidecarResult<Resource> {
        info!(path = input, "Processing audio");
        warn!("Audio transcription is not available; returning a bare record");

        let normalized = normalize_path(input);
        let title = file_title(std::path::Path::new(&normalized), input.trim());
        let resource = Resource::new(Uuid::new_v4(), ResourceType::Audio, title, input);
        self.ctx
            .progress()
            .report(ProgressStage::Complete, 100, "Audio record created");
        Ok(resource)
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::Audio
    }

    fn name(&self) -> &str {
        "audio"
    }
}
