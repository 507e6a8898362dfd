use crate::context::{is_valid_header, OutboundResponse};
use dashmap::DashMap;
use http::StatusCode;
use may_minihttp::Response;
use std::sync::OnceLock;
use tracing::{error, warn};

/// Headers minihttp writes itself.
const TRANSPORT_HEADERS: [&str; 3] = ["content-length", "date", "server"];

/// Header names whose lines are interned for the life of the process.
const INTERNED_HEADERS: [&str; 2] = ["content-type", "connection"];

/// Past this many interned lines, new ones go through the connection's arena.
const MAX_INTERNED_LINES: usize = 256;

/// minihttp holds at most this many headers per response.
pub const MAX_RESPONSE_HEADERS: usize = 16;

fn interned() -> &'static DashMap<String, &'static str> {
    static LINES: OnceLock<DashMap<String, &'static str>> = OnceLock::new();
    LINES.get_or_init(DashMap::new)
}

fn interned_line(line: &str) -> Option<&'static str> {
    if let Some(existing) = interned().get(line) {
        return Some(*existing);
    }
    if interned().len() >= MAX_INTERNED_LINES {
        return None;
    }
    let leaked: &'static str = Box::leak(line.to_string().into_boxed_str());
    Some(*interned().entry(line.to_string()).or_insert(leaked))
}

/// Owned storage for the header lines of the response in flight on one
/// connection.
///
/// minihttp only takes `&'static str` header lines, but it copies them into
/// its write buffer as soon as `call` returns and before it calls the same
/// service again. Lines handed out for one response live until the next
/// [`HeaderLines::recycle`] or until the arena drops with its service.
#[derive(Debug, Default)]
pub(crate) struct HeaderLines {
    lines: Vec<Box<str>>,
}

impl HeaderLines {
    /// Free the lines of the previous response.
    pub(crate) fn recycle(&mut self) {
        self.lines.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }

    #[allow(unsafe_code)]
    fn hold(&mut self, line: String) -> &'static str {
        let line = line.into_boxed_str();
        let ptr: *const str = &*line;
        self.lines.push(line);
        // SAFETY: pushing the box does not move its heap allocation, which
        // is freed only by `recycle` or drop. The service calls `recycle`
        // at the start of the next request, after minihttp has encoded the
        // response borrowing these lines, and drops with its connection.
        unsafe { &*ptr }
    }
}

/// `Name: value` lines for every header of `resp` the transport does not
/// write itself.
///
/// Lines that would break the header block are dropped, and so is anything
/// past minihttp's header limit.
pub(crate) fn header_lines(
    resp: &OutboundResponse,
    arena: &mut HeaderLines,
) -> Vec<&'static str> {
    let mut lines = Vec::with_capacity(resp.headers.len());
    for (name, value) in &resp.headers {
        if TRANSPORT_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if !is_valid_header(name, value) {
            error!(header = %name, "Header with invalid name or value dropped from response");
            continue;
        }
        if lines.len() == MAX_RESPONSE_HEADERS {
            warn!(
                header = %name,
                limit = MAX_RESPONSE_HEADERS,
                "Response header limit reached, header dropped"
            );
            continue;
        }
        let line = format!("{name}: {value}");
        let interned = if INTERNED_HEADERS.contains(&name.as_str()) {
            interned_line(&line)
        } else {
            None
        };
        lines.push(match interned {
            Some(line) => line,
            None => arena.hold(line),
        });
    }
    lines
}

pub fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Write an [`OutboundResponse`] into the transport's response.
pub(crate) fn write_response(
    res: &mut Response,
    resp: OutboundResponse,
    arena: &mut HeaderLines,
) {
    res.status_code(usize::from(resp.status), status_reason(resp.status));
    for line in header_lines(&resp, arena) {
        res.header(line);
    }
    res.body_vec(resp.body);
}
