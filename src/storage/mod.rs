use chrono::{DateTime, Utc};

pub mod file;

pub use file::FileStorage;

/// A stored paste as seen by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteEntry {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}
