//! Transient in-memory previews
//!
//! A [`Preview`] holds fetched or selected binary content under a
//! `preview:<n>` reference. Dropping the preview releases it; the registry's
//! live count makes outstanding previews observable.
//!
//! # Example
//!
//! ```
//! use defect_control_client::preview::{PreviewRegistry, PreviewSlot};
//!
//! let registry = PreviewRegistry::new();
//! let mut slot = PreviewSlot::default();
//!
//! slot.replace(registry.create("image/png", vec![1u8, 2, 3]));
//! slot.replace(registry.create("image/png", vec![4u8]));
//! assert_eq!(registry.live(), 1);
//!
//! slot.clear();
//! assert_eq!(registry.live(), 0);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;

/// Issues previews and counts the ones still alive
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    next: Arc<AtomicU64>,
    live: Arc<AtomicUsize>,
}

impl PreviewRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps content in a new preview
    pub fn create(&self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Preview {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.live.fetch_add(1, Ordering::SeqCst);

        Preview {
            reference: format!("preview:{}", id),
            content_type: content_type.into(),
            data: data.into(),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of previews not yet released
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Transient binary preview, released on drop
pub struct Preview {
    reference: String,
    content_type: String,
    data: Bytes,
    live: Arc<AtomicUsize>,
}

impl Preview {
    /// Local reference, `preview:<n>`
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// MIME type of the content
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Content bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Content size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the content is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preview")
            .field("reference", &self.reference)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(reference = %self.reference, "Preview released");
    }
}

/// Holds at most one preview; replacing releases the previous one
#[derive(Debug, Default)]
pub struct PreviewSlot {
    current: Option<Preview>,
}

impl PreviewSlot {
    /// Stores a preview, releasing any previous one
    pub fn replace(&mut self, preview: Preview) {
        self.current = Some(preview);
    }

    /// Releases the held preview
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Held preview, if any
    pub fn get(&self) -> Option<&Preview> {
        self.current.as_ref()
    }
}
