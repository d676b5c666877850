//! Content-Type lookup by file extension.

use std::path::Path;

use phf::phf_map;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

static MIME_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "html" => "text/html",
    "htm" => "text/html",
    "css" => "text/css",
    "js" => "text/javascript",
    "mjs" => "text/javascript",
    "json" => "application/json",
    "xml" => "application/xml",
    "txt" => "text/plain",
    "md" => "text/markdown",
    "csv" => "text/csv",
    "svg" => "image/svg+xml",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "ico" => "image/x-icon",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "pdf" => "application/pdf",
    "wasm" => "application/wasm",
    "zip" => "application/zip",
    "mp4" => "video/mp4",
    "mp3" => "audio/mpeg",
};

/// Returns the MIME type for `path`, judged by its extension
/// (case-insensitive).
pub fn content_type(path: &Path) -> &'static str {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .and_then(|ext| MIME_TYPES.get(ext.as_str()).copied())
        .unwrap_or(DEFAULT_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type(Path::new("www/index.html")), "text/html");
        assert_eq!(content_type(Path::new("logo.PNG")), "image/png");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back() {
        assert_eq!(content_type(Path::new("archive.xyz")), DEFAULT_MIME_TYPE);
        assert_eq!(content_type(Path::new("Makefile")), DEFAULT_MIME_TYPE);
    }
}
