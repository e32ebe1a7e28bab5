//! On-disk layout of one resource.
//!
//! ```text
//! <library_root>/<id>/<title>.md
//! <library_root>/<id>/assets/page_<p>_img_<i>.<ext>
//! ```

use std::path::{Path, PathBuf};

use friday_core::SidecarResult;
use tracing::debug;

/// Name of the asset sub-directory.
pub const ASSETS_DIR: &str = "assets";

/// Directories for a single resource.
#[derive(Debug, Clone)]
pub struct ResourceLayout {
    resource_dir: PathBuf,
    assets_dir: PathBuf,
}

impl ResourceLayout {
    /// Create `<library_root>/<id>/assets`. Existing directories are fine.
    pub fn create(library_root: &Path, id: &str) -> SidecarResult<Self> {
        let resource_dir = library_root.join(id);
        let assets_dir = resource_dir.join(ASSETS_DIR);
        std::fs::create_dir_all(&assets_dir)?;
        debug!(dir = %resource_dir.display(), "Created resource layout");

        Ok(Self {
            resource_dir,
            assets_dir,
        })
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Path of the markdown file for `title`.
    pub fn markdown_path(&self, title: &str) -> PathBuf {
        self.resource_dir.join(format!("{}.md", title))
    }

    /// Path of an asset, with 1-based page and image indices.
    pub fn asset_path(&self, page: u32, image: usize, extension: &str) -> PathBuf {
        self.assets_dir.join(asset_file_name(page, image, extension))
    }
}

/// `page_<p>_img_<i>.<ext>`
pub fn asset_file_name(page: u32, image: usize, extension: &str) -> String {
    format!("page_{}_img_{}.{}", page, image, extension)
}

/// Markdown link target for an asset, relative to the resource directory.
pub fn relative_asset_link(file_name: &str) -> String {
    format!("{}/{}", ASSETS_DIR, file_name)
}
