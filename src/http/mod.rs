//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 side of the server: parsing requests,
//! serializing responses and the per-connection state machine.
//!
//! # Architecture
//!
//! - **`connection`**: per-socket session driving read → dispatch → write
//! - **`parser`**: parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: serializes responses and writes them across partial writes
//! - **`error`**: protocol errors and their conversion to error pages
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Accepted   │ ← Registered with the poller
//!        └──────┬──────┘
//!               ▼
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait until a full request head is buffered
//!        └──────┬──────┘
//!               │ Request parsed (or rejected with an error page)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Dispatch, then flush the response
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Draining ← Our half shut down, input discarded
//!                              │ Peer EOF
//!                              ▼
//!                            Closed
//! ```
//!
//! EOF and I/O errors move a connection straight to `Closed`.

pub mod connection;
pub mod error;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

/// The only protocol version the server speaks.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Header names the server reads or writes.
pub mod header {
    pub const CONNECTION: &str = "Connection";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const ETAG: &str = "ETag";
    pub const IF_MATCH: &str = "If-Match";
    pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    pub const LAST_MODIFIED: &str = "Last-Modified";

    pub const KEEP_ALIVE: &str = "keep-alive";
    pub const CLOSE: &str = "close";
}
