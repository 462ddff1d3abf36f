//! HTTP static-file adapter
//!
//! [`ServeHandler`] maps request paths onto the virtual filesystem below a root
//! prefix and answers with `http` crate responses. Each request opens its own
//! handle; the filesystem itself is shared.
//!
//! Directory requests:
//! - without a trailing slash they are redirected (`301`) to the slash form;
//! - a direct `index.html` child is served in place of the directory;
//! - otherwise an HTML listing of the children is returned.

pub mod mime;
pub mod server;

use crate::entry::Metadata;
use crate::error::FsError;
use crate::fs::Filesystem;
use crate::handle::{Handle, VirtualFile, Whence};
use chrono::{DateTime, Utc};
use http::header;
use http::{Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::io::Read;
use tracing::{debug, warn};

pub const INDEX_FILE: &str = "index.html";

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone)]
pub struct ServeHandler {
    fs: Filesystem,
    root: String,
}

/// A byte range resolved against a file size; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    end: u64,
}

impl ServeHandler {
    pub(crate) fn new(fs: Filesystem, root: &str) -> Self {
        Self {
            fs,
            root: root.to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Answer a plain `GET` for `path`.
    pub fn get(&self, path: &str) -> Response<Vec<u8>> {
        match Request::get(path).body(()) {
            Ok(request) => self.handle(&request),
            Err(_) => respond(StatusCode::BAD_REQUEST, &[]),
        }
    }

    pub fn handle<B>(&self, request: &Request<B>) -> Response<Vec<u8>> {
        let method = request.method();
        if method != Method::GET && method != Method::HEAD {
            return respond(StatusCode::METHOD_NOT_ALLOWED, &[(header::ALLOW, "GET, HEAD")]);
        }

        let raw_path = request.uri().path();
        let Some(segments) = request_segments(raw_path) else {
            warn!(path = raw_path, "rejected request path");
            return respond(StatusCode::BAD_REQUEST, &[]);
        };
        let vpath = self.virtual_path(&segments);

        let response = if vpath.is_empty() {
            self.serve_top_level(request, raw_path)
        } else {
            match self.fs.open(&vpath) {
                Ok(handle) if handle.is_dir() => {
                    self.serve_directory(request, raw_path, &vpath, handle)
                }
                Ok(handle) if raw_path.ends_with('/') => {
                    match raw_path.trim_end_matches('/') {
                        "" => serve_file(request, handle),
                        trimmed => redirect(trimmed.to_string()),
                    }
                }
                Ok(handle) => serve_file(request, handle),
                Err(FsError::NotFound { .. }) => respond(StatusCode::NOT_FOUND, &[]),
                Err(err) => {
                    warn!(path = %vpath, error = %err, "open failed");
                    respond(StatusCode::INTERNAL_SERVER_ERROR, &[])
                }
            }
        };

        debug!(
            method = %method,
            path = raw_path,
            status = response.status().as_u16(),
            "served"
        );
        if method == Method::HEAD {
            strip_body(response)
        } else {
            response
        }
    }

    fn virtual_path(&self, segments: &[String]) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(segments.len() + 1);
        if !self.root.is_empty() {
            parts.push(&self.root);
        }
        parts.extend(segments.iter().map(String::as_str));
        parts.join("/")
    }

    /// Requests that resolve to the bundle root when no root prefix is set.
    fn serve_top_level<B>(&self, request: &Request<B>, raw_path: &str) -> Response<Vec<u8>> {
        if !raw_path.ends_with('/') {
            return redirect(format!("{raw_path}/"));
        }
        if let Ok(index) = self.fs.open(INDEX_FILE) {
            if !index.is_dir() {
                return serve_file(request, index);
            }
        }
        let listing = self
            .fs
            .index()
            .children("")
            .unwrap_or(&[])
            .iter()
            .filter_map(|path| self.fs.stat(path).ok())
            .collect::<Vec<_>>();
        listing_response(raw_path, &listing)
    }

    fn serve_directory<B>(
        &self,
        request: &Request<B>,
        raw_path: &str,
        vpath: &str,
        mut dir: Handle,
    ) -> Response<Vec<u8>> {
        if !raw_path.ends_with('/') {
            return redirect(format!("{raw_path}/"));
        }
        if let Ok(index) = self.fs.open(&format!("{vpath}/{INDEX_FILE}")) {
            if !index.is_dir() {
                return serve_file(request, index);
            }
        }
        match dir.readdir(-1) {
            Ok(listing) => listing_response(raw_path, &listing),
            Err(err) => {
                warn!(path = vpath, error = %err, "readdir failed");
                respond(StatusCode::INTERNAL_SERVER_ERROR, &[])
            }
        }
    }
}

fn serve_file<B>(request: &Request<B>, mut file: Handle) -> Response<Vec<u8>> {
    let meta = file.stat();
    let modified = meta.modified();
    let last_modified = modified.format(HTTP_DATE).to_string();

    if not_modified_since(request, modified) {
        return respond(
            StatusCode::NOT_MODIFIED,
            &[(header::LAST_MODIFIED, last_modified.as_str())],
        );
    }

    let size = meta.size();
    let range = match request.headers().get(header::RANGE) {
        Some(value) => match value.to_str().ok().and_then(|v| parse_range(v, size)) {
            Some(range) => Some(range),
            None => {
                let content_range = format!("bytes */{size}");
                return respond(
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    &[(header::CONTENT_RANGE, content_range.as_str())],
                );
            }
        },
        None => None,
    };

    let ByteRange { start, end } = range.unwrap_or(ByteRange {
        start: 0,
        end: size,
    });
    let body = match read_span(&mut file, start, end) {
        Ok(body) => body,
        Err(err) => {
            warn!(file = meta.name(), error = %err, "read failed");
            return respond(StatusCode::INTERNAL_SERVER_ERROR, &[]);
        }
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, mime::content_type(meta.name()))
        .header(header::LAST_MODIFIED, last_modified)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, body.len());
    builder = match range {
        Some(_) => builder.status(StatusCode::PARTIAL_CONTENT).header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, end - 1, size),
        ),
        None => builder.status(StatusCode::OK),
    };
    builder.body(body).unwrap_or_else(|_| internal_error())
}

fn read_span(file: &mut Handle, start: u64, end: u64) -> Result<Vec<u8>, FsError> {
    file.seek(start as i64, Whence::Start)?;
    let mut body = Vec::with_capacity((end - start) as usize);
    file.by_ref()
        .take(end - start)
        .read_to_end(&mut body)
        .map_err(|e| FsError::CorruptBundle(e.to_string()))?;
    Ok(body)
}

fn not_modified_since<B>(request: &Request<B>, modified: DateTime<Utc>) -> bool {
    request
        .headers()
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|since| modified.timestamp() <= since.timestamp())
        .unwrap_or(false)
}

/// Parse a single `bytes=` range. Multi-range requests are not supported.
fn parse_range(value: &str, size: u64) -> Option<ByteRange> {
    let spec = value.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (first, last) = spec.split_once('-')?;
    let (first, last) = (first.trim(), last.trim());

    let range = if first.is_empty() {
        let suffix: u64 = last.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        ByteRange {
            start: size.saturating_sub(suffix),
            end: size,
        }
    } else {
        let start: u64 = first.parse().ok()?;
        let end = if last.is_empty() {
            size
        } else {
            let last: u64 = last.parse().ok()?;
            if last < start {
                return None;
            }
            last.saturating_add(1).min(size)
        };
        ByteRange { start, end }
    };

    (range.start < range.end).then_some(range)
}

/// Decode and split a request path. `None` when it escapes upwards or is malformed.
fn request_segments(path: &str) -> Option<Vec<String>> {
    if !path.starts_with('/') {
        return None;
    }
    let decoded = percent_decode(path)?;
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => segments.push(s.to_string()),
        }
    }
    Some(segments)
}

/// Malformed escapes stay literal; a decoded path that is not UTF-8 is `None`.
fn percent_decode(input: &str) -> Option<String> {
    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn listing_response(raw_path: &str, listing: &[Metadata]) -> Response<Vec<u8>> {
    let mut html = String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n");
    html.push_str(&format!("<title>Index of {}</title>\n<pre>\n", escape_html(raw_path)));
    for meta in listing {
        let name = if meta.is_dir() {
            format!("{}/", meta.name())
        } else {
            meta.name().to_string()
        };
        let name = escape_html(&name);
        html.push_str(&format!("<a href=\"{name}\">{name}</a>\n"));
    }
    html.push_str("</pre>\n");

    let body = html.into_bytes();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CONTENT_LENGTH, body.len())
        .body(body)
        .unwrap_or_else(|_| internal_error())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn redirect(location: String) -> Response<Vec<u8>> {
    respond(
        StatusCode::MOVED_PERMANENTLY,
        &[(header::LOCATION, location.as_str())],
    )
}

fn respond(status: StatusCode, headers: &[(header::HeaderName, &str)]) -> Response<Vec<u8>> {
    let body = match status {
        StatusCode::NOT_MODIFIED | StatusCode::MOVED_PERMANENTLY => Vec::new(),
        _ => format!("{}\n", status.canonical_reason().unwrap_or("")).into_bytes(),
    };
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name.clone(), *value);
    }
    if !body.is_empty() {
        builder = builder
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(header::CONTENT_LENGTH, body.len());
    }
    builder.body(body).unwrap_or_else(|_| internal_error())
}

fn internal_error() -> Response<Vec<u8>> {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn strip_body(response: Response<Vec<u8>>) -> Response<Vec<u8>> {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Vec::new())
}
