//! Markdown assembly.

use chrono::{DateTime, Utc};

/// Heading of the image section.
pub const IMAGES_HEADING: &str = "## Extracted Images";

/// Markdown rendering of one ingested document.
#[derive(Debug, Clone)]
pub struct MarkdownDocument<'a> {
    pub title: &'a str,
    pub source: &'a str,
    pub processed_at: DateTime<Utc>,
    /// Concatenated page sections.
    pub body: &'a str,
    /// Asset file names, in extraction order.
    pub images: &'a [String],
}

impl MarkdownDocument<'_> {
    /// Render the full document.
    ///
    /// Image links are relative to the resource directory so the folder can
    /// be moved as a whole.
    pub fn render(&self) -> String {
        let mut md = String::with_capacity(self.body.len() + 256);

        md.push_str(&format!("# {}\n\n", self.title));
        md.push_str(&format!("**Source**: {}\n\n", self.source));
        md.push_str(&format!(
            "**Processed**: {}\n\n",
            self.processed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str("---\n\n");
        md.push_str(self.body);

        if !self.images.is_empty() {
            if !md.ends_with("\n\n") {
                md.push_str("\n\n");
            }
            md.push_str(IMAGES_HEADING);
            md.push_str("\n\n");
            for file_name in self.images {
                let stem = file_name
                    .rsplit_once('.')
                    .map(|(stem, _)| stem)
                    .unwrap_or(file_name.as_str());
                md.push_str(&format!(
                    "![{}]({})\n\n",
                    stem,
                    super::layout::relative_asset_link(file_name)
                ));
            }
        }

        md
    }
}
