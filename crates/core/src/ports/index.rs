//! File-index port — persistence for filenames discovered on devices.

use std::future::Future;

use crate::error::StoreError;
use crate::index::FileIndex;

/// Persistent store for the device file index.
///
/// The transfer engine is the single logical writer; a `save` replaces the
/// whole document, and atomicity is the implementation's concern.
pub trait FileIndexStore: Send + Sync {
    /// Load the current index, or an empty one when nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<FileIndex, StoreError>> + Send;

    /// Replace the stored index.
    fn save(&self, index: &FileIndex) -> impl Future<Output = Result<(), StoreError>> + Send;
}
