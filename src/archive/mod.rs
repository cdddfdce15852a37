/// Archive access
///
/// - `record.rs` - the archive's per-date payload
/// - `client.rs` - single-date and range retrieval over HTTP
/// - `preview.rs` - downloading and downscaling display references

pub mod client;
pub mod preview;
pub mod record;

pub use client::{ArchiveClient, ImageService};
pub use record::ImageRecord;
