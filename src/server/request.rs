use crate::context::InboundRequest;
use http::{Method, Version};
use may_minihttp::Request;
use std::io::{self, Read};
use tracing::debug;

/// Decode a `may_minihttp` request into an [`InboundRequest`].
///
/// Header names are lowercased and values decoded lossily. The body is read in
/// full; an unknown method is rejected as `InvalidData`.
pub fn decode_request(req: Request) -> io::Result<InboundRequest> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let uri = req.path().to_string();
    // minihttp reports the minor version: 0 for HTTP/1.0, 1 for HTTP/1.1
    let version = match format!("{:?}", req.version()).as_str() {
        "0" => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    debug!(
        method = %method,
        uri = %uri,
        http_version = ?version,
        header_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    Ok(InboundRequest {
        method,
        uri,
        version,
        headers,
        body,
    })
}
