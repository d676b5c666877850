use std::io::{self, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::http::response::Response;

/// Serializes a response into the exact bytes written to the socket:
/// status line, headers, blank line, then the body if there is one.
pub fn serialize_response(resp: &Response) -> Bytes {
    let body_len = resp.body.as_ref().map_or(0, Vec::len);
    let mut buf = BytesMut::with_capacity(256 + body_len);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.put_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    // Header/body separator
    buf.put_slice(b"\r\n");

    if let Some(body) = &resp.body {
        buf.put_slice(body);
    }

    buf.freeze()
}

/// Holds the part of a serialized response that has not reached the peer yet.
pub struct ResponseWriter {
    buffer: Bytes,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
        }
    }

    /// Writes as much as the stream accepts.
    ///
    /// Returns `Ok(true)` once every byte is flushed and `Ok(false)` when a
    /// non-blocking stream stops accepting data; the remainder stays queued
    /// for the next call.
    pub fn write_to<W: Write>(&mut self, stream: &mut W) -> io::Result<bool> {
        while self.buffer.has_remaining() {
            match stream.write(self.buffer.chunk()) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    ));
                }
                Ok(n) => {
                    self.buffer.advance(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        stream.flush()?;
        Ok(true)
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{ResponseBuilder, StatusCode};

    /// Accepts at most `chunk` bytes per call and blocks every other call.
    struct Trickle {
        out: Vec<u8>,
        chunk: usize,
        block_next: bool,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.block_next = !self.block_next;
            if !self.block_next {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.chunk);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn serialized_length_is_head_plus_body() {
        let response = ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", "text/plain")
            .body(b"hello".to_vec())
            .build();

        let bytes = serialize_response(&response);
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let head_len = text.find("\r\n\r\n").unwrap() + 4;

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert_eq!(bytes.len(), head_len + 5);
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn absent_body_ends_after_blank_line() {
        let bytes = serialize_response(&Response::not_modified());

        assert_eq!(&bytes[..], b"HTTP/1.1 304 Not Modified\r\n\r\n");
    }

    #[test]
    fn partial_writes_resume_where_they_stopped() {
        let response = ResponseBuilder::new(StatusCode::Ok)
            .body(vec![b'x'; 100])
            .build();
        let expected = serialize_response(&response);

        let mut writer = ResponseWriter::new(&response);
        let mut stream = Trickle {
            out: Vec::new(),
            chunk: 7,
            block_next: false,
        };

        let mut rounds = 0;
        while !writer.write_to(&mut stream).unwrap() {
            rounds += 1;
            assert!(rounds < 1000);
        }

        assert!(rounds > 1);
        assert_eq!(writer.remaining(), 0);
        assert_eq!(stream.out, expected.to_vec());
    }
}
