//! Static resources on disk.
//!
//! - **`conditional`**: `If-Match`, `If-None-Match` and `If-Modified-Since`
//!   validators plus entity tag and HTTP date helpers
//! - **`resolver`**: maps request paths to files and snapshots them as [`FileInfo`]

pub mod conditional;
pub mod resolver;

pub use resolver::{FileInfo, ResourceResolver};
