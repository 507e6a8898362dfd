//! Transport-neutral request and response types, and the per-request context.
//!
//! [`InboundRequest`] and [`OutboundResponse`] are what the dispatcher consumes
//! and produces. [`RequestContext`] is built once per request from the inbound
//! request and carries everything the parameter extractors read: query and form
//! parameters, headers, cookies, body, uploaded files, the lazily resolved
//! session and the captured handler failure. It also holds the outbound facade
//! ([`ResponseParts`]) that handlers use to set status, headers and cookies.

use crate::error::HandlerError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::multipart::{self, MultipartConfig, MultipartError, MultipartParser, UploadedFile};
use crate::route::Route;
use crate::router::{normalize_path, ParamVec};
use crate::session::{SessionHandle, SessionStore, SESSION_COOKIE};
use http::{Method, Version};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parse a `Cookie` header value into (name, value) pairs.
#[must_use]
pub fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Decode the query string of a raw URI into ordered (name, value) pairs.
#[must_use]
pub fn parse_query(uri: &str) -> Vec<(String, String)> {
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    match without_fragment.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

/// A request as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub method: Method,
    /// Raw request target, including any query string.
    pub uri: String,
    pub version: Version,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: Version::HTTP_11,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching content type.
    #[must_use]
    pub fn json<T: Serialize>(self, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.header("content-type", "application/json").body(body)
    }

    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// First value of a header, case-insensitive.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Whether `name: value` can be written as one header line. Rejects CR, LF
/// and other control bytes that would split the header block.
#[must_use]
pub fn is_valid_header(name: &str, value: &str) -> bool {
    http::header::HeaderName::from_bytes(name.as_bytes()).is_ok()
        && http::header::HeaderValue::from_bytes(value.as_bytes()).is_ok()
}

/// A fully rendered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut resp = Self::new(status);
        resp.set_header("content-type", content_type);
        resp.body = body.into();
        resp
    }

    #[must_use]
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::with_body(status, "application/json", value.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::with_body(status, "text/plain; charset=utf-8", body.into())
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::with_body(status, "text/html; charset=utf-8", body.into())
    }

    /// `302 Found` with a `Location` header.
    pub fn redirect(location: impl Into<String>) -> Self {
        let mut resp = Self::new(302);
        resp.set_header("location", location);
        resp
    }

    /// Replace every header of this name with a single value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value.into()));
    }

    /// Append a header, keeping existing values (e.g. `set-cookie`).
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// Name of the first header that cannot be written to the wire.
    #[must_use]
    pub fn invalid_header(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, v)| !is_valid_header(k, v))
            .map(|(k, _)| k.as_str())
    }

    /// Body as UTF-8, lossy.
    #[must_use]
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Status, headers and cookies a handler sets on the response it does not
/// build itself. Merged into the rendered response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseParts {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    cookies: Vec<String>,
}

impl ResponseParts {
    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value.into()));
    }

    /// Queue a `Set-Cookie` with `Path=/`.
    pub fn add_cookie(&mut self, name: &str, value: &str) {
        self.cookies.push(format!("{name}={value}; Path=/"));
    }

    /// Queue a raw `Set-Cookie` value.
    pub fn add_set_cookie(&mut self, raw: impl Into<String>) {
        self.cookies.push(raw.into());
    }

    #[must_use]
    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    /// Merge into a rendered response. The status only overrides a 200.
    pub fn apply_to(&self, resp: &mut OutboundResponse) {
        if let Some(status) = self.status {
            if resp.status == 200 {
                resp.status = status;
            }
        }
        for (name, value) in &self.headers {
            resp.set_header(name, value.clone());
        }
        for cookie in &self.cookies {
            resp.add_header("set-cookie", cookie.clone());
        }
    }
}

/// Everything known about one request while it moves through the pipeline.
pub struct RequestContext {
    method: Method,
    uri: String,
    path: String,
    version: Version,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Vec<u8>,
    files: Vec<UploadedFile>,
    multipart_error: Option<MultipartError>,
    request_id: RequestId,
    sessions: Option<Arc<dyn SessionStore>>,
    session: Option<SessionHandle>,
    /// The attached session was created by this request.
    session_created: bool,
    route: Option<Arc<Route>>,
    path_params: Option<ParamVec>,
    failure: Option<Arc<HandlerError>>,
    response: ResponseParts,
}

impl RequestContext {
    /// Decode an inbound request: query string, cookies, and url-encoded or
    /// multipart form bodies. Form text fields are appended to the query
    /// parameters. A malformed multipart body is remembered and reported by the
    /// file extractors.
    pub fn from_inbound(
        req: InboundRequest,
        sessions: Option<Arc<dyn SessionStore>>,
        multipart_config: &MultipartConfig,
    ) -> Self {
        let InboundRequest {
            method,
            uri,
            version,
            headers,
            body,
        } = req;

        let path = normalize_path(&uri).to_string();
        let mut params = parse_query(&uri);
        let cookies = headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| parse_cookies(v))
            .collect::<Vec<_>>();
        let request_id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(REQUEST_ID_HEADER))
                .map(|(_, v)| v.as_str()),
        );

        let content_type = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        let mut files = Vec::new();
        let mut multipart_error = None;
        if !body.is_empty() {
            if content_type
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
            {
                params.extend(
                    url::form_urlencoded::parse(&body).map(|(k, v)| (k.into_owned(), v.into_owned())),
                );
            } else if multipart::is_multipart(&content_type) {
                let parsed = multipart::parse_boundary(&content_type).and_then(|boundary| {
                    MultipartParser::new(&boundary, *multipart_config).parse(&body)
                });
                match parsed {
                    Ok(parts) => {
                        for part in &parts {
                            if let Some(file) = UploadedFile::from_part(part) {
                                files.push(file);
                            } else if let Some(text) = part.text() {
                                params.push((part.name.clone(), text.to_string()));
                            }
                        }
                        debug!(
                            request_id = %request_id,
                            parts = parts.len(),
                            files = files.len(),
                            "Multipart body decoded"
                        );
                    }
                    Err(err) => {
                        warn!(request_id = %request_id, error = %err, "Multipart body rejected");
                        multipart_error = Some(err);
                    }
                }
            }
        }

        Self {
            method,
            uri,
            path,
            version,
            headers,
            params,
            cookies,
            body,
            files,
            multipart_error,
            request_id,
            sessions,
            session: None,
            session_created: false,
            route: None,
            path_params: None,
            failure: None,
            response: ResponseParts::default(),
        }
    }

    /// Context for an inbound request with no session store and default
    /// multipart limits.
    #[must_use]
    pub fn new(req: InboundRequest) -> Self {
        Self::from_inbound(req, None, &MultipartConfig::default())
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request path without query string or trailing slash.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// First value of a header, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Query or form parameter. Last write wins for repeated keys.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query or form parameter, in order.
    pub fn param_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Uploaded files of one form field, in arrival order.
    pub fn files<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field_name() == field)
    }

    #[must_use]
    pub fn all_files(&self) -> &[UploadedFile] {
        &self.files
    }

    #[must_use]
    pub fn multipart_error(&self) -> Option<&MultipartError> {
        self.multipart_error.as_ref()
    }

    /// Record the matched route and, when known, its path variable bindings.
    pub fn set_route(&mut self, route: Arc<Route>, path_params: Option<ParamVec>) {
        self.route = Some(route);
        self.path_params = path_params;
    }

    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn path_params(&self) -> Option<&ParamVec> {
        self.path_params.as_ref()
    }

    /// Value of a path variable.
    ///
    /// Uses the bindings captured when the route matched; without them the
    /// bindings are derived again from the route's template and the path.
    #[must_use]
    pub fn path_variable(&self, name: &str) -> Option<String> {
        let lookup = |params: &ParamVec| {
            params
                .iter()
                .rfind(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v.clone())
        };
        match &self.path_params {
            Some(params) => lookup(params),
            None => self
                .route
                .as_ref()
                .and_then(|route| route.pattern.matches(&self.path))
                .and_then(|params| lookup(&params)),
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Arc<HandlerError>> {
        self.failure.as_ref()
    }

    pub fn set_failure(&mut self, failure: Arc<HandlerError>) {
        self.failure = Some(failure);
    }

    /// Session of this request, if one is already attached or the session
    /// cookie names a live one. Never creates a session.
    pub fn existing_session(&mut self) -> Option<SessionHandle> {
        if let Some(session) = &self.session {
            return Some(Arc::clone(session));
        }
        let store = self.sessions.as_ref()?;
        let id = self
            .cookies
            .iter()
            .rfind(|(k, _)| k == SESSION_COOKIE)
            .map(|(_, v)| v.as_str())?;
        let session = store.load(id)?;
        self.session = Some(Arc::clone(&session));
        Some(session)
    }

    /// Session of this request, creating one (and queueing its cookie) when
    /// none exists. `None` only when no session store is configured.
    pub fn session_or_create(&mut self) -> Option<SessionHandle> {
        if let Some(session) = self.existing_session() {
            return Some(session);
        }
        let store = self.sessions.as_ref()?;
        let session = store.create();
        self.response.add_set_cookie(format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly",
            session.id()
        ));
        debug!(
            request_id = %self.request_id,
            session_id = %session.id(),
            "Session attached"
        );
        self.session = Some(Arc::clone(&session));
        self.session_created = true;
        Some(session)
    }

    /// Invalidate a session created by this request. Used when the request
    /// fails, since its cookie never reaches the client.
    pub fn discard_new_session(&mut self) {
        if !self.session_created {
            return;
        }
        self.session_created = false;
        if let (Some(store), Some(session)) = (&self.sessions, self.session.take()) {
            store.invalidate(session.id());
        }
    }

    #[must_use]
    pub fn response(&self) -> &ResponseParts {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseParts {
        &mut self.response
    }

    /// Persistent-connection decision: HTTP/1.1 unless `Connection: close`,
    /// HTTP/1.0 only with `Connection: keep-alive`.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("connection").map(str::to_ascii_lowercase);
        match connection.as_deref() {
            Some(v) if v.split(',').any(|t| t.trim() == "close") => false,
            Some(v) if v.split(',').any(|t| t.trim() == "keep-alive") => true,
            _ => self.version != Version::HTTP_10,
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("params", &self.params)
            .field("files", &self.files.len())
            .field("route", &self.route.as_ref().map(|r| Arc::clone(&r.handler_name)))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("a=b; c=d; flag");
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_query_keeps_repeats() {
        let q = parse_query("/p?x=1&y=hello%20world&x=2#top");
        assert_eq!(q.len(), 3);
        assert_eq!(q[1], ("y".to_string(), "hello world".to_string()));
        assert_eq!(q[2], ("x".to_string(), "2".to_string()));
        assert!(parse_query("/p").is_empty());
    }

    #[test]
    fn test_header_validation_rejects_line_breaks() {
        assert!(is_valid_header("location", "/home?q=a%0D%0Ab"));
        assert!(is_valid_header("content-disposition", "attachment; filename=\"é.txt\""));
        assert!(!is_valid_header("location", "/home\r\nSet-Cookie: evil=1"));
        assert!(!is_valid_header("x-a", "one\ntwo"));
        assert!(!is_valid_header("x-a\r\nx-b", "v"));
        assert!(!is_valid_header("", "v"));

        let mut resp = OutboundResponse::redirect("/ok");
        assert_eq!(resp.invalid_header(), None);
        resp.add_header("set-cookie", "a=1\r\n");
        assert_eq!(resp.invalid_header(), Some("set-cookie"));
    }

    #[test]
    fn test_context_query_last_wins() {
        let ctx = RequestContext::new(InboundRequest::get("/p?x=1&x=2"));
        assert_eq!(ctx.param("x"), Some("2"));
        assert_eq!(ctx.param_values("x").collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(ctx.path(), "/p");
    }

    #[test]
    fn test_urlencoded_form_merges_into_params() {
        let req = InboundRequest::post("/form?a=1")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("b=2&c=three+words");
        let ctx = RequestContext::new(req);
        assert_eq!(ctx.param("a"), Some("1"));
        assert_eq!(ctx.param("b"), Some("2"));
        assert_eq!(ctx.param("c"), Some("three words"));
    }

    #[test]
    fn test_headers_case_insensitive_and_cookies() {
        let req = InboundRequest::get("/")
            .header("X-Token", "abc")
            .header("Cookie", "theme=dark; lang=en");
        let ctx = RequestContext::new(req);
        assert_eq!(ctx.header("x-token"), Some("abc"));
        assert_eq!(ctx.header("X-TOKEN"), Some("abc"));
        assert_eq!(ctx.cookie("lang"), Some("en"));
        assert_eq!(ctx.cookie("missing"), None);
    }

    #[test]
    fn test_session_created_once_and_cookie_queued() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::default());
        let mut ctx = RequestContext::from_inbound(
            InboundRequest::get("/"),
            Some(Arc::clone(&store)),
            &MultipartConfig::default(),
        );
        assert!(ctx.existing_session().is_none());
        let first = ctx.session_or_create().unwrap();
        let second = ctx.session_or_create().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.response().cookies().len(), 1);
        assert!(ctx.response().cookies()[0].starts_with("WAYPOINT_SESSION="));

        let cookie = format!("{SESSION_COOKIE}={}", first.id());
        let mut next = RequestContext::from_inbound(
            InboundRequest::get("/").header("cookie", cookie),
            Some(store),
            &MultipartConfig::default(),
        );
        let resumed = next.existing_session().unwrap();
        assert!(Arc::ptr_eq(&first, &resumed));
        assert!(next.response().cookies().is_empty());
    }

    #[test]
    fn test_discard_new_session_keeps_resumed_ones() {
        let store = Arc::new(InMemorySessionStore::default());
        let shared: Arc<dyn SessionStore> = store.clone();
        let mut ctx = RequestContext::from_inbound(
            InboundRequest::get("/"),
            Some(Arc::clone(&shared)),
            &MultipartConfig::default(),
        );
        let created = ctx.session_or_create().unwrap();
        assert_eq!(store.len(), 1);
        ctx.discard_new_session();
        assert!(store.is_empty());
        assert!(store.load(created.id()).is_none());

        let live = store.create();
        let mut next = RequestContext::from_inbound(
            InboundRequest::get("/").header("cookie", format!("{SESSION_COOKIE}={}", live.id())),
            Some(shared),
            &MultipartConfig::default(),
        );
        next.session_or_create().unwrap();
        next.discard_new_session();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_session_without_store() {
        let mut ctx = RequestContext::new(InboundRequest::get("/"));
        assert!(ctx.session_or_create().is_none());
    }

    #[test]
    fn test_keep_alive_rules() {
        let ctx = RequestContext::new(InboundRequest::get("/"));
        assert!(ctx.keep_alive());
        let ctx = RequestContext::new(InboundRequest::get("/").header("connection", "close"));
        assert!(!ctx.keep_alive());
        let ctx = RequestContext::new(InboundRequest::get("/").version(Version::HTTP_10));
        assert!(!ctx.keep_alive());
        let ctx = RequestContext::new(
            InboundRequest::get("/")
                .version(Version::HTTP_10)
                .header("Connection", "Keep-Alive"),
        );
        assert!(ctx.keep_alive());
    }

    #[test]
    fn test_request_id_reused_from_header() {
        let id = RequestId::new();
        let ctx = RequestContext::new(InboundRequest::get("/").header("X-Request-Id", id.to_string()));
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn test_response_parts_merge() {
        let mut parts = ResponseParts::default();
        parts.set_status(201);
        parts.set_header("X-Trace", "1");
        parts.add_cookie("a", "b");
        let mut resp = OutboundResponse::text(200, "ok");
        parts.apply_to(&mut resp);
        assert_eq!(resp.status, 201);
        assert_eq!(resp.get_header("x-trace"), Some("1"));
        assert_eq!(resp.header_values("set-cookie").collect::<Vec<_>>(), vec!["a=b; Path=/"]);

        let mut redirect = OutboundResponse::redirect("/next");
        parts.apply_to(&mut redirect);
        assert_eq!(redirect.status, 302);
    }
}
