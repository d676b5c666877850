//! Protocol-level failures.
//!
//! Every condition the server can answer with an error status is one
//! variant of [`HttpError`]; [`HttpError::into_response`] is the only place
//! an error becomes a [`Response`].

use std::io;

use thiserror::Error;

use crate::http::parser::ParseError;
use crate::http::response::{Response, StatusCode};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("The HTTP method is not supported by the resource")]
    MethodNotAllowed,

    #[error("The precondition given in the request evaluated to false")]
    PreconditionFailed,

    #[error("The request exceeds the limit of {0} bytes")]
    RequestTooLarge(usize),

    #[error("The server failed to read the requested resource")]
    InternalServerError(#[source] io::Error),

    #[error("The HTTP version {0} is not supported by the server")]
    VersionNotSupported(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BadRequest,
            HttpError::NotFound(_) => StatusCode::NotFound,
            HttpError::MethodNotAllowed => StatusCode::MethodNotAllowed,
            HttpError::PreconditionFailed => StatusCode::PreconditionFailed,
            HttpError::RequestTooLarge(_) => StatusCode::RequestHeaderFieldsTooLarge,
            HttpError::InternalServerError(_) => StatusCode::InternalServerError,
            HttpError::VersionNotSupported(_) => StatusCode::HttpVersionNotSupported,
        }
    }

    /// Converts the error into the page sent to the client.
    pub fn into_response(self) -> Response {
        Response::error_page(self.status(), &self.to_string())
    }
}

impl From<ParseError> for HttpError {
    fn from(err: ParseError) -> Self {
        HttpError::BadRequest(err.to_string())
    }
}
