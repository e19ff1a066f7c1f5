//! Media dialog building blocks
//!
//! - `AssetBrowser`: paged listing of the asset host
//! - `UploadPipeline`: validation and concurrent uploads
//! - `MediaSelection`: cover / supporting images / video edit state
//! - `DialogStore`: open dialog sessions
//!
//! `services::DialogService` ties them to the persisted entities.

mod browser;
mod dialog;
mod selection;
mod upload;

pub use browser::AssetBrowser;
pub use dialog::{DialogStore, DialogTarget, MediaDialog, SharedDialog};
pub use selection::{MediaSelection, SelectionError, SelectionSlot};
pub use upload::{UploadError, UploadOutcome, UploadPipeline, UploadReport};
