//! Request handling: picks a handler by method and runs it against the
//! resolved resource.

pub mod file;

use crate::config::Config;
use crate::http::error::HttpError;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::resource::ResourceResolver;

pub use file::FileHandler;

/// Selects the handler for a method. Only GET and HEAD are served.
pub fn handler_for(method: Method) -> Result<FileHandler, HttpError> {
    match method {
        Method::GET => Ok(FileHandler::Get),
        Method::HEAD => Ok(FileHandler::Head),
        _ => Err(HttpError::MethodNotAllowed),
    }
}

/// Turns requests into responses.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    resolver: ResourceResolver,
}

impl Dispatcher {
    pub fn new(resolver: ResourceResolver) -> Self {
        Self { resolver }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ResourceResolver::from_config(config))
    }

    pub fn dispatch(&self, request: &Request) -> Result<Response, HttpError> {
        let handler = handler_for(request.method)?;
        let file = self.resolver.resolve(request)?;
        handler.respond(&file)
    }

    /// Like [`dispatch`](Self::dispatch), with errors already turned into
    /// error pages.
    pub fn respond(&self, request: &Request) -> Response {
        self.dispatch(request).unwrap_or_else(|err| {
            tracing::debug!(path = %request.path, status = err.status().as_u16(), error = %err, "Request failed");
            err.into_response()
        })
    }
}
