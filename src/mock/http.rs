use std::collections::HashMap;

use crate::config::ServerConfig;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_NDJSON: &str = "application/x-ndjson";

/// Largest request line plus headers accepted before answering 400.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;
/// Bodies beyond this are truncated rather than buffered.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Terminating chunk of a `Transfer-Encoding: chunked` body.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub content_length: usize,
}

impl RequestHead {
    /// Path component of the request target, without query or fragment.
    pub fn path(&self) -> String {
        request_path(&self.target)
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_well_formed(&self) -> bool {
        !self.method.is_empty() && !self.target.is_empty()
    }
}

pub fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|idx| idx + 4)
}

/// Parses the request line and headers. Header names are lowercased and a
/// missing or unparsable `Content-Length` counts as zero.
pub fn parse_request_head(buffer: &[u8]) -> RequestHead {
    let head = String::from_utf8_lossy(buffer);
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();

    let mut headers = HashMap::new();
    let mut content_length = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let key = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if key == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.insert(key, value);
        }
    }

    RequestHead {
        method,
        target,
        headers,
        content_length,
    }
}

pub fn request_path(target: &str) -> String {
    match url::Url::parse("http://localhost/").and_then(|base| base.join(target)) {
        Ok(url) => url.path().to_string(),
        Err(_) => target
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotImplemented,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotImplemented => 501,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotImplemented => "Not Implemented",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    Length(usize),
    Chunked,
}

/// Status line and headers for every response the server sends. The CORS
/// headers are unconditional; `X-Frame-Options` follows `allow_iframe`.
pub fn response_head(
    status: Status,
    content_type: Option<&str>,
    framing: Framing,
    config: &ServerConfig,
) -> String {
    let mut head = format!("HTTP/1.1 {} {}\r\n", status.code(), status.reason());

    if let Some(content_type) = content_type {
        head.push_str(&format!("Content-Type: {}\r\n", content_type));
    }

    head.push_str("Access-Control-Allow-Origin: *\r\n");
    head.push_str("Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n");
    head.push_str("Access-Control-Allow-Headers: Content-Type\r\n");
    if config.allow_iframe {
        head.push_str("X-Frame-Options: ALLOWALL\r\n");
    }

    match framing {
        Framing::Length(len) => head.push_str(&format!("Content-Length: {}\r\n", len)),
        Framing::Chunked => {
            head.push_str("Cache-Control: no-cache\r\n");
            head.push_str("Transfer-Encoding: chunked\r\n");
        }
    }

    head.push_str("Connection: close\r\n\r\n");
    head
}

pub fn encode_chunk(data: &[u8]) -> Vec<u8> {
    let mut chunk = format!("{:X}\r\n", data.len()).into_bytes();
    chunk.extend_from_slice(data);
    chunk.extend_from_slice(b"\r\n");
    chunk
}
