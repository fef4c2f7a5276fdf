//! Multipart uploads and progress reporting
//!
//! Files selected for upload are read fully into memory and sent as a single
//! multipart request under the `files` field. The transport reports bytes as
//! they leave the client; views follow the resulting percentage through a
//! watch channel.
//!
//! # Example
//!
//! ```
//! use defect_control_client::upload::{progress_channel, FileUpload, MultipartForm};
//!
//! let form = MultipartForm::files(vec![
//!     FileUpload::new("crack.jpg", "image/jpeg", vec![0u8; 300]),
//!     FileUpload::new("notes.txt", "text/plain", vec![0u8; 100]),
//! ]);
//!
//! let (reporter, progress) = progress_channel();
//! reporter.start(form.total_bytes());
//! reporter.advance(200);
//!
//! assert_eq!(progress.borrow().percent(), 50);
//! ```

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;

use crate::error::{ClientError, ClientResult};

/// Multipart field the API reads uploaded files from
pub const FILES_FIELD: &str = "files";

/// Single file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// File name sent with the part
    pub file_name: String,

    /// MIME type sent with the part
    pub content_type: String,

    /// File contents
    pub data: Bytes,
}

impl FileUpload {
    /// Creates an upload from in-memory contents
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Reads a local file, guessing its content type from the extension
    ///
    /// # Errors
    ///
    /// Returns `ClientError::File` if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::File(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, guess_content_type(path), data))
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the file can be previewed inline
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Guesses a MIME type from a file extension, falling back to `application/octet-stream`
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}

/// Multipart payload: one or more files under a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    /// Field name every file is sent under
    pub field: String,

    /// Files in selection order
    pub files: Vec<FileUpload>,
}

impl MultipartForm {
    /// Builds a form with the given files under the `files` field
    pub fn files(files: Vec<FileUpload>) -> Self {
        Self {
            field: FILES_FIELD.to_string(),
            files,
        }
    }

    /// Total payload size in bytes
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.len() as u64).sum()
    }

    /// File names in selection order
    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_name.clone()).collect()
    }
}

/// Upload progress snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes handed to the network so far
    pub sent: u64,

    /// Total bytes in the payload
    pub total: u64,
}

impl UploadProgress {
    /// Percentage sent, 0 through 100; an empty payload counts as complete
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }

        (self.sent.min(self.total) * 100 / self.total) as u8
    }

    /// Whether every byte has been sent
    pub fn is_complete(&self) -> bool {
        self.sent >= self.total
    }
}

/// Sending side of an upload progress channel
///
/// Cloning shares the same channel, so every file part of a request can
/// report into one counter.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<UploadProgress>>,
}

/// Creates a progress channel starting at zero of zero bytes
pub fn progress_channel() -> (ProgressReporter, watch::Receiver<UploadProgress>) {
    let (tx, rx) = watch::channel(UploadProgress::default());
    (ProgressReporter { tx: Arc::new(tx) }, rx)
}

impl ProgressReporter {
    /// Resets the counter for a new payload of `total` bytes
    pub fn start(&self, total: u64) {
        self.tx.send_replace(UploadProgress { sent: 0, total });
    }

    /// Records `bytes` more as sent
    pub fn advance(&self, bytes: u64) {
        self.tx.send_modify(|p| p.sent = (p.sent + bytes).min(p.total));
    }

    /// Marks the payload as fully sent
    pub fn finish(&self) {
        self.tx.send_modify(|p| p.sent = p.total);
    }

    /// Current snapshot
    pub fn current(&self) -> UploadProgress {
        *self.tx.borrow()
    }

    /// New receiver following this channel
    pub fn subscribe(&self) -> watch::Receiver<UploadProgress> {
        self.tx.subscribe()
    }
}

/// Splits a file body into chunks of at most `chunk_size` bytes
pub(crate) fn chunk_bytes(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect()
}
