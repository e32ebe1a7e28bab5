//! The canonical record produced by every ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Kind of ingested item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Pdf,
    Video,
    Audio,
}

/// One ingested document or media item.
///
/// Built once, at the end of a successful run. Nothing inside the sidecar
/// mutates it afterwards, so `created_at == updated_at` on every record the
/// pipelines return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Fresh random identifier, also the name of the resource directory.
    pub id: String,

    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    pub title: String,

    /// Input exactly as the host sent it.
    pub source: String,

    /// Absolute path of the generated markdown, if assembly ran.
    pub md_path: Option<String>,

    /// Extracted asset paths, in extraction order.
    #[serde(default)]
    pub assets: Vec<String>,

    /// Reserved for an embedding index reference. Never set here.
    pub vector_index: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Create a record stamped with the current time.
    pub fn new(
        id: Uuid,
        resource_type: ResourceType,
        title: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            resource_type,
            title: title.into(),
            source: source.into(),
            md_path: None,
            assets: Vec::new(),
            vector_index: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the markdown path.
    pub fn with_md_path(mut self, md_path: impl Into<String>) -> Self {
        self.md_path = Some(md_path.into());
        self
    }

    /// Set the asset list.
    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }
}
