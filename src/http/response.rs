use std::collections::HashMap;

use super::header;

/// HTTP status codes the server can answer with.
///
/// - `Ok` (200): File served
/// - `NotModified` (304): Cached copy is still fresh
/// - `BadRequest` (400): Malformed request
/// - `NotFound` (404): Resource not found
/// - `MethodNotAllowed` (405): HTTP method not supported
/// - `PreconditionFailed` (412): `If-Match` evaluated to false
/// - `RequestHeaderFieldsTooLarge` (431): Request head exceeds the read limit
/// - `InternalServerError` (500): Filesystem failure
/// - `HttpVersionNotSupported` (505): Request line carries another version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 304 Not Modified
    NotModified,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 412 Precondition Failed
    PreconditionFailed,
    /// 431 Request Header Fields Too Large
    RequestHeaderFieldsTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
    /// 505 HTTP Version Not Supported
    HttpVersionNotSupported,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotModified.as_u16(), 304);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotModified => 304,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PreconditionFailed => 412,
            StatusCode::RequestHeaderFieldsTooLarge => 431,
            StatusCode::InternalServerError => 500,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::PreconditionFailed.reason_phrase(), "Precondition Failed");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PreconditionFailed => "Precondition Failed",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Represents a complete HTTP response ready to be serialized.
///
/// `body` is `None` for HEAD and 304 responses; headers such as
/// `Content-Length` still describe the full representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Protocol version written on the status line
    pub version: String,
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Response body as bytes, absent when nothing follows the head
    pub body: Option<Vec<u8>>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// A builder lives for exactly one request and is consumed by `build`.
///
/// # Example
///
/// ```
/// # use lantern::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .body(b"hi".to_vec())
///     .build();
/// assert_eq!(response.headers.get("Content-Length").unwrap(), "2");
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends `<tag>text</tag>` followed by CRLF to the body.
    pub fn html(mut self, tag: &str, text: &str) -> Self {
        let body = self.body.get_or_insert_with(Vec::new);
        body.extend_from_slice(format!("<{tag}>{text}</{tag}>\r\n").as_bytes());
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a Content-Length header matching the body when a body is set and
    /// no length was given explicitly.
    pub fn build(mut self) -> Response {
        if let Some(body) = &self.body {
            self.headers
                .entry(header::CONTENT_LENGTH.to_string())
                .or_insert_with(|| body.len().to_string());
        }

        Response {
            version: super::HTTP_VERSION.to_string(),
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a 304 Not Modified response: no body and no entity headers.
    pub fn not_modified() -> Self {
        ResponseBuilder::new(StatusCode::NotModified).build()
    }

    /// Creates an HTML error page for the given status.
    pub fn error_page(status: StatusCode, message: &str) -> Self {
        ResponseBuilder::new(status)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .html("h1", &status.to_string())
            .html("p", message)
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }
}
