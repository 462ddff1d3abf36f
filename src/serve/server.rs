//! Minimal blocking HTTP/1.1 server
//!
//! One request per connection, answered with `Connection: close`. Enough to
//! preview a bundle from the CLI; not meant to face the open internet.

use super::ServeHandler;
use http::{Request, Response, StatusCode, Version};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_LINE: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Accept connections on `listener` and answer them one at a time.
pub fn serve(listener: TcpListener, handler: &ServeHandler) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, root = handler.root(), "serving bundle");
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(err) = serve_connection(stream, handler) {
                    warn!(error = %err, "connection failed");
                }
            }
            Err(err) => warn!(error = %err, "accept failed"),
        }
    }
    Ok(())
}

/// Read one request from `stream`, dispatch it and write the response.
pub fn serve_connection(stream: TcpStream, handler: &ServeHandler) -> io::Result<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let peer = stream.peer_addr().ok();
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let response = match read_request(&mut reader) {
        Ok(request) => handler.handle(&request),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            debug!(?peer, error = %err, "malformed request");
            let mut response = Response::new(b"Bad Request\n".to_vec());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            response
        }
        Err(err) => return Err(err),
    };

    write_response(&mut writer, &response)?;
    writer.flush()
}

fn read_request<R: BufRead>(reader: &mut R) -> io::Result<Request<()>> {
    let line = read_line(reader)?;
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid(format!("bad request line: {line:?}")));
    };
    let version = match version {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/1.1" => Version::HTTP_11,
        other => return Err(invalid(format!("unsupported version {other}"))),
    };

    let mut builder = Request::builder()
        .method(method)
        .uri(target)
        .version(version);
    let mut count = 0;
    loop {
        let line = read_line(reader)?;
        if line.is_empty() {
            break;
        }
        count += 1;
        if count > MAX_HEADERS {
            return Err(invalid("too many headers".to_string()));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| invalid(format!("bad header line: {line:?}")))?;
        builder = builder.header(name.trim(), value.trim());
    }

    builder.body(()).map_err(|e| invalid(e.to_string()))
}

/// Read a CRLF (or bare LF) terminated line without the terminator.
fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut buf = Vec::new();
    let n = reader
        .by_ref()
        .take(MAX_LINE as u64 + 1)
        .read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before request was complete",
        ));
    }
    if !buf.ends_with(b"\n") {
        return Err(invalid("line too long".to_string()));
    }
    buf.pop();
    if buf.ends_with(b"\r") {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|e| invalid(e.to_string()))
}

fn write_response<W: Write>(writer: &mut W, response: &Response<Vec<u8>>) -> io::Result<()> {
    let status = response.status();
    write!(
        writer,
        "HTTP/1.1 {} {}\r\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("")
    )?;
    for (name, value) in response.headers() {
        writer.write_all(name.as_str().as_bytes())?;
        writer.write_all(b": ")?;
        writer.write_all(value.as_bytes())?;
        writer.write_all(b"\r\n")?;
    }
    if !response.headers().contains_key(http::header::CONTENT_LENGTH) {
        write!(writer, "content-length: {}\r\n", response.body().len())?;
    }
    writer.write_all(b"connection: close\r\n\r\n")?;
    writer.write_all(response.body())
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
