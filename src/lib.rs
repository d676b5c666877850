//! Lantern - Static HTTP/1.1 File Server
//!
//! Core library: wire codec, conditional requests, file resolution and the
//! single-threaded event loop.

pub mod config;
pub mod handler;
pub mod http;
pub mod resource;
pub mod server;
