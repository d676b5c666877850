use std::io::{self, Read, Write};
use std::net::Shutdown;

use anyhow::Context;
use bytes::{Buf, BytesMut};

use crate::handler::Dispatcher;
use crate::http::error::HttpError;
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::http::{HTTP_VERSION, header};

/// Bytes requested from the socket per read call.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Largest request head a connection buffers. Bodies are skipped as they
/// arrive and do not count.
pub const MAX_REQUEST_SIZE: usize = 8192;

/// Input discarded after our final response before the socket is dropped
/// regardless of the peer.
pub const LINGER_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, nothing read yet
    Accepted,
    /// Waiting for the rest of a request
    Reading,
    /// A request (or an error page) is staged for writing
    Writing,
    /// Final response sent and our half shut down; input is discarded until
    /// the peer closes
    Draining,
    Closed,
}

/// A byte stream whose sending half can be shut down on its own.
pub trait Transport: Read + Write {
    fn shutdown_write(&self) -> io::Result<()>;
}

impl Transport for mio::net::TcpStream {
    fn shutdown_write(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

/// One client connection and the exchange in flight on it.
///
/// Holds at most one request and one response at a time. Once a response
/// is fully written both are cleared, so a persistent connection can serve
/// the next request.
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    request: Option<Request>,
    /// Error page produced while reading; written without dispatching
    response: Option<Response>,
    writer: Option<ResponseWriter>,
    /// Body bytes of the current request still to be skipped
    body_remaining: usize,
    linger_budget: usize,
    keep_alive: bool,
    peer_closed: bool,
    state: ConnectionState,
}

impl<S: Transport> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            request: None,
            response: None,
            writer: None,
            body_remaining: 0,
            linger_budget: 0,
            keep_alive: false,
            peer_closed: false,
            state: ConnectionState::Accepted,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Moves a freshly accepted connection to waiting for its first request.
    pub fn start_reading(&mut self) -> ConnectionState {
        if self.state == ConnectionState::Accepted {
            self.state = ConnectionState::Reading;
        }
        self.state
    }

    /// Marks the connection closed; the owner drops it on its next sweep.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.request = None;
        self.response = None;
        self.writer = None;
    }

    /// Drains the socket into the request buffer and tries to parse a request.
    ///
    /// EOF before any new data closes the connection without a response.
    pub fn on_readable(&mut self) -> anyhow::Result<ConnectionState> {
        if self.state == ConnectionState::Draining {
            return Ok(self.drain());
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut received = 0;

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    if received == 0 {
                        self.close();
                        return Ok(self.state);
                    }
                    self.peer_closed = true;
                    break;
                }
                Ok(n) => {
                    received += n;
                    self.buffer.extend_from_slice(&chunk[..n]);
                    self.skip_body();
                    if self.buffer.len() > MAX_REQUEST_SIZE {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("reading request"),
            }
        }

        Ok(self.advance())
    }

    /// Builds the response if none is staged yet and writes as much of it
    /// as the socket takes.
    ///
    /// The `Connection` header mirrors the client's request header; without
    /// an explicit `keep-alive` the connection closes after the response.
    pub fn on_writable(&mut self, dispatcher: &Dispatcher) -> anyhow::Result<ConnectionState> {
        if self.writer.is_none() {
            let mut response = match (self.response.take(), self.request.as_ref()) {
                (Some(response), _) => response,
                (None, Some(request)) => dispatcher.respond(request),
                (None, None) => anyhow::bail!("connection became writable with no request staged"),
            };

            let connection = if self.keep_alive {
                header::KEEP_ALIVE
            } else {
                header::CLOSE
            };
            response.set_header(header::CONNECTION, connection);

            match &self.request {
                Some(request) => tracing::info!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status.as_u16(),
                    "Responding"
                ),
                None => tracing::info!(status = response.status.as_u16(), "Responding to unparsable request"),
            }

            self.writer = Some(ResponseWriter::new(&response));
        }

        let Some(writer) = self.writer.as_mut() else {
            anyhow::bail!("response writer missing");
        };

        if !writer.write_to(&mut self.stream).context("writing response")? {
            return Ok(self.state);
        }

        self.writer = None;
        self.request = None;

        if !self.keep_alive {
            return Ok(self.linger());
        }

        // a pipelined request may already be buffered
        Ok(self.advance())
    }

    fn advance(&mut self) -> ConnectionState {
        if self.request.is_some() || self.response.is_some() {
            self.state = ConnectionState::Writing;
            return self.state;
        }

        self.skip_body();
        if self.body_remaining > 0 {
            if self.peer_closed {
                self.close();
            } else {
                self.state = ConnectionState::Reading;
            }
            return self.state;
        }

        match parse_http_request(&self.buffer) {
            Ok((request, consumed)) => {
                self.buffer.advance(consumed);
                self.body_remaining = request.content_length();
                self.skip_body();
                self.keep_alive = request.keep_alive() && !self.peer_closed;

                tracing::debug!(method = %request.method, path = %request.path, "Received request");

                if request.version != HTTP_VERSION {
                    self.response = Some(HttpError::VersionNotSupported(request.version.clone()).into_response());
                }
                self.request = Some(request);
                self.state = ConnectionState::Writing;
            }
            Err(ParseError::Incomplete) if self.buffer.len() > MAX_REQUEST_SIZE => {
                self.reject(HttpError::RequestTooLarge(MAX_REQUEST_SIZE));
            }
            Err(ParseError::Incomplete) if self.peer_closed => self.close(),
            Err(ParseError::Incomplete) => self.state = ConnectionState::Reading,
            Err(e) => self.reject(e.into()),
        }

        self.state
    }

    fn skip_body(&mut self) {
        let skipped = self.body_remaining.min(self.buffer.len());
        self.buffer.advance(skipped);
        self.body_remaining -= skipped;
    }

    /// Stages an error page for a request that could not be parsed. The
    /// stream cannot be resynchronised afterwards, so the connection closes
    /// once the page is written.
    fn reject(&mut self, err: HttpError) {
        tracing::debug!(status = err.status().as_u16(), error = %err, "Rejecting request");
        self.buffer.clear();
        self.body_remaining = 0;
        self.keep_alive = false;
        self.response = Some(err.into_response());
        self.state = ConnectionState::Writing;
    }

    /// Shuts down our sending half after the final response and starts
    /// discarding input. Dropping a socket with unread input resets it,
    /// which can destroy the response before the peer reads it.
    fn linger(&mut self) -> ConnectionState {
        if self.peer_closed {
            self.close();
            return self.state;
        }

        if let Err(e) = self.stream.shutdown_write() {
            tracing::debug!(error = %e, "Unable to shut down connection");
            self.close();
            return self.state;
        }

        self.buffer.clear();
        self.linger_budget = LINGER_LIMIT + self.body_remaining;
        self.state = ConnectionState::Draining;
        self.drain()
    }

    fn drain(&mut self) -> ConnectionState {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.close();
                    break;
                }
                Ok(n) => {
                    self.linger_budget = self.linger_budget.saturating_sub(n);
                    if self.linger_budget == 0 {
                        self.close();
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => {
                    self.close();
                    break;
                }
            }
        }

        self.state
    }
}
