/// The longest request head (request line plus headers) we accept
pub const MAX_HEAD: usize = 8192;

/// The largest request body we will read (and discard)
pub const MAX_BODY: usize = 65536;

/// HTTP request methods, as far as ECP cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// Anything else
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Self::Get,
            "POST" => Self::Post,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Other(s) => s,
        })
    }
}

/// One parsed ECP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The request method
    pub method: Method,
    /// The path, still percent-encoded, without any query string
    pub path: String,
    /// The query string, if there was one (without the `?`)
    pub query: Option<String>,
    /// Total bytes consumed: head plus body
    pub length: usize,
}

/// Why a request could not be understood
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// The request head isn't text
    #[error("request head is not UTF-8")]
    InvalidData,
    /// The first line isn't `METHOD target VERSION`
    #[error("malformed request line")]
    MissingRequestLine,
    /// No end of headers within [`MAX_HEAD`] bytes
    #[error("request head too large")]
    HeadTooLarge,
    /// Content-Length isn't a number, or is too big
    #[error("bad Content-Length")]
    BadContentLength,
}

fn find_end_of_head(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|n| n + 4)
}

/// Try to parse one request from the start of `buffer`
///
/// Returns `Ok(None)` if more data is needed. The body, if any, must
/// have arrived too; it is counted in [`Request::length`] but
/// otherwise ignored.
///
/// # Errors
///
/// Returns a [`ParseError`] if the request can never be valid however
/// much more data arrives.
///
pub fn parse(buffer: &[u8]) -> Result<Option<Request>, ParseError> {
    let Some(head_len) = find_end_of_head(buffer) else {
        if buffer.len() > MAX_HEAD {
            return Err(ParseError::HeadTooLarge);
        }
        return Ok(None);
    };
    if head_len > MAX_HEAD {
        return Err(ParseError::HeadTooLarge);
    }
    let head = std::str::from_utf8(&buffer[0..head_len])
        .map_err(|_| ParseError::InvalidData)?;
    let mut lines = head.split("\r\n");

    let mut parts = lines.next().unwrap_or("").split_ascii_whitespace();
    let (Some(method), Some(target), Some(_version)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::MissingRequestLine);
    };

    let mut body_len = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                body_len = value
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::BadContentLength)?;
                if body_len > MAX_BODY {
                    return Err(ParseError::BadContentLength);
                }
            }
        }
    }

    if buffer.len() < head_len + body_len {
        return Ok(None);
    }

    let (path, query) = split_target(target);
    Ok(Some(Request {
        method: Method::parse(method),
        path,
        query,
        length: head_len + body_len,
    }))
}

/// Split a request target into path and query, dropping any
/// `http://host` prefix
fn split_target(target: &str) -> (String, Option<String>) {
    let target = match target.find("://") {
        Some(n) => {
            let rest = &target[n + 3..];
            rest.find('/').map_or("/", |slash| &rest[slash..])
        }
        None => target,
    };
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    }
}

/// An ECP response: always `200 OK`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The Content-Type header value
    pub content_type: &'static str,
    /// The body
    pub body: Vec<u8>,
}

impl Response {
    /// An XML document
    #[must_use]
    pub fn xml(body: impl Into<String>) -> Self {
        Self {
            content_type: "text/xml",
            body: body.into().into_bytes(),
        }
    }

    /// An empty plain-text body
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            content_type: "text/plain",
            body: Vec::new(),
        }
    }

    /// A PNG image
    #[must_use]
    pub fn png(body: &[u8]) -> Self {
        Self {
            content_type: "image/png",
            body: body.to_vec(),
        }
    }

    /// Serialize, headers and body
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = format!(
            "HTTP/1.1 200 OK\r\n\
Content-Type: {}\r\n\
Content-Length: {}\r\n\
Server: {}\r\n\
Connection: close\r\n\
\r\n",
            self.content_type,
            self.body.len(),
            roku_ssdp::message::SERVER,
        )
        .into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}
