//! Attachment metadata
//!
//! Only metadata travels in listings; binary content is fetched on demand
//! through an authenticated request and never cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defect::DefectId;

/// Attachment identifier as issued by the API
pub type AttachmentId = u64;

/// Attachment metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique attachment ID
    pub id: AttachmentId,

    /// Owning defect
    #[serde(default)]
    pub defect_id: Option<DefectId>,

    /// Stored file name
    #[serde(default)]
    pub filename: String,

    /// Name of the file as uploaded, when the server keeps it separately
    #[serde(default)]
    pub original_name: Option<String>,

    /// MIME type
    #[serde(default)]
    pub content_type: String,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,

    /// When the file was uploaded
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Name to show: `filename`, else `original_name`, else `file-<id>`
    pub fn display_name(&self) -> String {
        if !self.filename.trim().is_empty() {
            return self.filename.clone();
        }

        self.original_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("file-{}", self.id))
    }

    /// Whether the content can be previewed inline
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}
