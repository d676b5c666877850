use std::fs;

use crate::http::error::HttpError;
use crate::http::header;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::resource::FileInfo;
use crate::resource::conditional::compute_etag;

/// Serves a resolved file for GET or HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileHandler {
    Get,
    Head,
}

impl FileHandler {
    /// Builds the response for a resolved file.
    ///
    /// Preconditions are checked first (412), then freshness (304). A full
    /// response carries `Content-Type`, `ETag`, `Content-Length` and
    /// `Last-Modified`; HEAD sends the same headers without the body.
    pub fn respond(&self, file: &FileInfo) -> Result<Response, HttpError> {
        if !file.valid {
            return Err(HttpError::PreconditionFailed);
        }

        if !file.modified {
            return Ok(Response::not_modified());
        }

        let contents = fs::read(&file.path).map_err(|e| {
            tracing::error!(path = %file.path.display(), error = %e, "Unable to read requested file");
            HttpError::InternalServerError(e)
        })?;

        let builder = ResponseBuilder::new(StatusCode::Ok)
            .header(header::CONTENT_TYPE, file.content_type.as_str())
            .header(header::ETAG, format!("\"{}\"", compute_etag(&contents)))
            .header(header::CONTENT_LENGTH, contents.len().to_string())
            .header(header::LAST_MODIFIED, file.last_modified.as_str());

        let response = match self {
            FileHandler::Get => builder.body(contents).build(),
            FileHandler::Head => builder.build(),
        };

        Ok(response)
    }
}
