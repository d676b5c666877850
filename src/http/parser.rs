use std::collections::HashMap;

use thiserror::Error;

use crate::http::header;
use crate::http::request::{Method, Request};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer does not yet hold a complete request.
    #[error("Request is incomplete")]
    Incomplete,

    #[error("Malformed request line: {0:?} (expected <method> <path> <version>)")]
    MalformedRequestLine(String),

    #[error("Unknown HTTP method {0:?}")]
    UnknownMethod(String),

    #[error("Invalid header entry format {0:?} (expected Key: Value)")]
    MalformedHeaderEntry(String),

    #[error("Request head is not valid UTF-8")]
    InvalidEncoding,

    #[error("Invalid Content-Length {0:?}")]
    InvalidContentLength(String),
}

/// Parses one request head from the front of `buf`.
///
/// Returns the request together with the number of bytes its head occupied
/// (leading blank lines included), so the caller can drain them. A body
/// announced by `Content-Length` is not part of that count; the caller skips
/// [`Request::content_length`] further bytes before the next request.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let leading = buf
        .iter()
        .take_while(|&&b| b == b'\r' || b == b'\n')
        .count();
    let buf = &buf[leading..];

    let head_len = find_head_end(buf).ok_or(ParseError::Incomplete)?;
    let head = std::str::from_utf8(&buf[..head_len]).map_err(|_| ParseError::InvalidEncoding)?;

    let mut lines = head
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    let request_line = lines.next().unwrap_or_default();
    let (method, path, version) = parse_request_line(request_line)?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (key, value) = parse_header_entry(line)?;
        headers.insert(key.to_string(), value.to_string());
    }

    if let Some(v) = headers.get(header::CONTENT_LENGTH) {
        v.parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(v.clone()))?;
    }

    let request = Request {
        method,
        path,
        version: version.to_string(),
        headers,
    };

    Ok((request, leading + head_len))
}

fn parse_request_line(line: &str) -> Result<(Method, String, &str), ParseError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let &[method, target, version] = tokens.as_slice() else {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    };

    if method.is_empty() || target.is_empty() || version.is_empty() {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    }

    let method = Method::from_str(method).ok_or_else(|| ParseError::UnknownMethod(method.to_string()))?;

    // query parameters are not part of the resource path
    let path = match target.split_once('?') {
        Some((path, _query)) => path,
        None => target,
    };

    Ok((method, path.to_string(), version))
}

fn parse_header_entry(line: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedHeaderEntry(line.to_string()))?;

    Ok((key, value.trim()))
}

/// Length of the request head including the blank line that ends it.
///
/// Accepts CRLF as well as bare LF line endings.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.iter().enumerate().find_map(|(i, &b)| {
        if b != b'\n' {
            return None;
        }
        let rest = &buf[i + 1..];
        if rest.starts_with(b"\n") {
            Some(i + 2)
        } else if rest.starts_with(b"\r\n") {
            Some(i + 3)
        } else {
            None
        }
    })
}
