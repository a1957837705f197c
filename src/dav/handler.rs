use chrono::SubsecRound;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{
    ACCEPT, ALLOW, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
    IF_MODIFIED_SINCE, LAST_MODIFIED,
};
use hyper::{Method, Request, Response, StatusCode};
use std::collections::{BTreeSet, VecDeque};
use std::error::Error as StdError;
use std::io;
use std::iter;
use std::sync::Arc;
use tracing::{debug, error};

use crate::provider::{ContentStatus, OperationDepth, PropfindIter, ReadableFilesystem};

use super::body::{self, DavBody};
use super::depth::{Depth, InvalidDepth};
use super::listing::{self, ListingEntry};
use super::multistatus;
use super::names::PropName;
use super::request::PropfindRequest;
use super::result::PropfindResult;
use super::{decode_path, href, http_date, parse_http_date};

/// Largest PROPFIND body accepted.
const MAX_PROPFIND_BODY: usize = 8 * 1024;

const ALLOWED_METHODS: &str = "OPTIONS, GET, PROPFIND";
const OCTET_STREAM: &str = "application/octet-stream";

const DAV: HeaderName = HeaderName::from_static("dav");
const DEPTH: HeaderName = HeaderName::from_static("depth");
const MS_AUTHOR_VIA: HeaderName = HeaderName::from_static("ms-author-via");

/// Serves a filesystem provider over WebDAV, optionally below a path prefix.
///
/// The handler answers `OPTIONS`, `GET` and `PROPFIND`. Every other method
/// gets `405`. It holds no per-request state, so one instance is shared by
/// all connections.
///
/// ## Example
///
/// ```ignore
/// let handler = DavHandler::new(Arc::new(provider), "/pd2");
/// let response = handler.handle(request).await;
/// ```
pub struct DavHandler {
    fs: Arc<dyn ReadableFilesystem>,
    /// Empty, or a path starting with `/` and not ending with one
    prefix: String,
}

impl DavHandler {
    /// Create a handler for `fs`.
    ///
    /// # Arguments
    ///
    /// * `fs` - The outermost provider of the chain
    /// * `prefix` - Path the tree is mounted under. Surrounding slashes are
    ///   ignored, so `"pd2"`, `"/pd2/"` and `"/pd2"` are the same mount.
    pub fn new(fs: Arc<dyn ReadableFilesystem>, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("/{prefix}")
        };
        Self { fs, prefix }
    }

    /// The normalized mount prefix: empty, or `/name` without a trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Answer one request.
    ///
    /// Failures become error responses, so this never fails. Every response
    /// carries a `DAV: 1` header.
    ///
    /// # Arguments
    ///
    /// * `req` - The request, with any body type hyper can hand over
    ///
    /// # Returns
    ///
    /// The response, whose body may still stream from the archive.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<DavBody>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let method = req.method().clone();
        let uri_path = req.uri().path().to_string();

        let mut response = if method == Method::OPTIONS {
            options()
        } else {
            match self.resolve(&uri_path) {
                Err(response) => response,
                Ok(path) if method == Method::GET => self.get(req.headers(), &path).await,
                Ok(path) if method.as_str() == "PROPFIND" => self.propfind(req, &path).await,
                Ok(_) => {
                    let mut response = text(StatusCode::METHOD_NOT_ALLOWED, "No");
                    response
                        .headers_mut()
                        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
                    response
                }
            }
        };

        response.headers_mut().insert(DAV, HeaderValue::from_static("1"));
        debug!("{} {} -> {}", method, uri_path, response.status().as_u16());
        response
    }

    /// Provider path for a request path, or the response refusing it.
    fn resolve(&self, uri_path: &str) -> Result<String, Response<DavBody>> {
        let rest = if self.prefix.is_empty() {
            uri_path
        } else {
            match uri_path.strip_prefix(self.prefix.as_str()) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => return Err(text(StatusCode::NOT_FOUND, "File not found")),
            }
        };
        let path = decode_path(rest)
            .map_err(|_| text(StatusCode::BAD_REQUEST, "Path is not valid UTF-8"))?;
        Ok(if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        })
    }

    /// Serve a file, or an HTML listing for a collection.
    ///
    /// Answers `304` when `If-Modified-Since` is no older than the
    /// resource's modification time.
    async fn get(&self, headers: &HeaderMap, path: &str) -> Response<DavBody> {
        let accept = accepted_types(headers);
        let content = self.fs.get_content(path, &accept).await;
        match content.status {
            ContentStatus::NotFound => return text(StatusCode::NOT_FOUND, "File not found"),
            ContentStatus::AccessDenied => return text(StatusCode::FORBIDDEN, "Access denied"),
            ContentStatus::Found => {}
        }

        // HTTP dates have no fractional seconds
        let last_modified = content.last_modified.map(|date| date.trunc_subsecs(0));
        if let (Some(modified), Some(since)) = (last_modified, if_modified_since(headers)) {
            if since >= modified {
                let mut response = respond(StatusCode::NOT_MODIFIED, body::empty());
                set_header(&mut response, LAST_MODIFIED, &http_date(&modified));
                return response;
            }
        }

        let mut response = if content.use_collection_fallback {
            self.listing(path)
        } else {
            let mut response = match content.body {
                None => respond(StatusCode::OK, body::empty()),
                Some(source) => match source.open().await {
                    Ok(stream) => respond(
                        StatusCode::OK,
                        body::from_reader(stream, content.content_length),
                    ),
                    Err(err) => {
                        error!("Failed to open {}: {:#}", path, err);
                        return text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                    }
                },
            };
            if let Some(length) = content.content_length {
                response
                    .headers_mut()
                    .insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
            let content_type = content.content_type.as_deref().unwrap_or(OCTET_STREAM);
            set_header(&mut response, CONTENT_TYPE, content_type);
            response
        };

        if let Some(modified) = last_modified {
            set_header(&mut response, LAST_MODIFIED, &http_date(&modified));
        }
        response
    }

    /// HTML page of a collection's children.
    fn listing(&self, path: &str) -> Response<DavBody> {
        let Some(results) =
            self.enumerate(path, OperationDepth::ONE_NO_ROOT, &PropfindRequest::default())
        else {
            return text(StatusCode::NOT_FOUND, "File not found");
        };

        let mut entries: Vec<ListingEntry> = results
            .map(|result| {
                let href = href(&self.prefix, result.path(), result.is_collection());
                ListingEntry::new(&result, href)
            })
            .collect();
        listing::sort_entries(&mut entries);

        let trimmed = path.trim_matches('/');
        let title = href(&self.prefix, trimmed, true);
        let title = decode_path(&title).unwrap_or(title);
        let parent = (!trimmed.is_empty()).then(|| {
            let parent = trimmed.rsplit_once('/').map_or("", |(parent, _)| parent);
            href(&self.prefix, parent, true)
        });

        let head = listing::page_head(&title, parent.as_deref());
        let rows = entries.into_iter().map(|entry| listing::page_row(&entry));
        let chunks = iter::once(head)
            .chain(rows)
            .chain(iter::once(listing::page_tail().to_string()))
            .map(|chunk| Ok(Bytes::from(chunk)));

        let mut response = respond(StatusCode::OK, body::from_iter(chunks));
        set_header(&mut response, CONTENT_TYPE, listing::CONTENT_TYPE);
        response
    }

    /// Answer a PROPFIND with a streamed `207 Multi-Status` body.
    ///
    /// The request is checked before the provider is asked anything: a bad
    /// `Depth` or body is a `400`, an oversized body a `413`.
    async fn propfind<B>(&self, req: Request<B>, path: &str) -> Response<DavBody>
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let depth = match depth_header(req.headers()) {
            Ok(depth) => depth,
            Err(err) => return text(StatusCode::BAD_REQUEST, err.to_string()),
        };

        let declared_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        if declared_length.is_some_and(|length| length > MAX_PROPFIND_BODY as u64) {
            return text(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        let content_type = req.headers().get(CONTENT_TYPE).cloned();

        let body = match Limited::new(req.into_body(), MAX_PROPFIND_BODY).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                return text(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                debug!("Failed to read PROPFIND body: {}", err);
                return text(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };

        let request = if body.is_empty() {
            PropfindRequest::default()
        } else {
            if !is_xml(content_type.as_ref()) {
                return text(StatusCode::BAD_REQUEST, "PROPFIND body must be XML");
            }
            match PropfindRequest::parse(&body) {
                Ok(request) => request,
                Err(err) => {
                    debug!("Rejected PROPFIND body: {}", err);
                    return text(StatusCode::BAD_REQUEST, format!("Invalid PROPFIND body: {err}"));
                }
            }
        };

        let Some(results) = self.enumerate(path, depth.operation_depth(), &request) else {
            return text(StatusCode::NOT_FOUND, "File not found");
        };
        let head = match multistatus::head() {
            Ok(head) => head,
            Err(err) => {
                error!("Failed to write multistatus: {:#}", err);
                return text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };

        let prefix = self.prefix.clone();
        let responses = results.map(move |result| {
            let href = href(&prefix, result.path(), result.is_collection());
            multistatus::response(&result, &href, &request)
                .map(Bytes::from)
                .map_err(|err| {
                    error!("Failed to write PROPFIND response for {}: {:#}", href, err);
                    io::Error::other(err)
                })
        });
        let chunks = iter::once(Ok(Bytes::from(head)))
            .chain(responses)
            .chain(iter::once(Ok(Bytes::from(multistatus::tail()))));

        let mut response = respond(StatusCode::MULTI_STATUS, body::from_iter(chunks));
        set_header(&mut response, CONTENT_TYPE, multistatus::CONTENT_TYPE);
        response
    }

    /// Enumerate through the provider, walking level by level when it
    /// cannot go deeper than one level itself.
    fn enumerate(
        &self,
        path: &str,
        depth: OperationDepth,
        request: &PropfindRequest,
    ) -> Option<PropfindIter> {
        let all_props = request.all_props();
        let props = request.extra_props();

        if depth.contains(OperationDepth::INCLUDE_DESCENDANTS) && !self.fs.supports_descendant_depth()
        {
            let first = depth.difference(OperationDepth::INCLUDE_DESCENDANTS)
                | OperationDepth::INCLUDE_CHILDREN;
            let current = self.fs.enumerate_properties(path, first, all_props, &props)?;
            return Some(Box::new(LevelWalk {
                fs: self.fs.clone(),
                all_props,
                props,
                root: path.trim_matches('/').to_string(),
                current,
                pending: VecDeque::new(),
            }));
        }

        self.fs.enumerate_properties(path, depth, all_props, &props)
    }
}

/// Infinite depth as a series of `1,noroot` enumerations, one per collection.
struct LevelWalk {
    fs: Arc<dyn ReadableFilesystem>,
    all_props: bool,
    props: BTreeSet<PropName>,
    root: String,
    current: PropfindIter,
    pending: VecDeque<String>,
}

impl Iterator for LevelWalk {
    type Item = PropfindResult;

    fn next(&mut self) -> Option<PropfindResult> {
        loop {
            if let Some(result) = self.current.next() {
                if result.is_collection() && result.path().trim_matches('/') != self.root {
                    self.pending.push_back(result.path().to_string());
                }
                return Some(result);
            }

            let path = self.pending.pop_front()?;
            if let Some(next) = self.fs.enumerate_properties(
                &path,
                OperationDepth::ONE_NO_ROOT,
                self.all_props,
                &self.props,
            ) {
                self.current = next;
            }
        }
    }
}

/// Capabilities of the server, the same for every path.
fn options() -> Response<DavBody> {
    let mut response = respond(StatusCode::OK, body::empty());
    let headers = response.headers_mut();
    headers.insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(MS_AUTHOR_VIA, HeaderValue::from_static("DAV"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    response
}

fn respond(status: StatusCode, body: DavBody) -> Response<DavBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

fn text(status: StatusCode, message: impl Into<Bytes>) -> Response<DavBody> {
    let mut response = respond(status, body::full(message));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Set a header whose value comes from a provider or a formatter.
fn set_header(response: &mut Response<DavBody>, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(_) => debug!("Dropping invalid {} header value {:?}", name, value),
    }
}

/// The single `Depth` header, or infinity when there is none.
fn depth_header(headers: &HeaderMap) -> Result<Depth, InvalidDepth> {
    let mut values = headers.get_all(DEPTH).iter();
    match (values.next(), values.next()) {
        (None, _) => Depth::parse(None),
        (Some(value), None) => Depth::parse(Some(value.to_str().map_err(|_| InvalidDepth)?)),
        (Some(_), Some(_)) => Err(InvalidDepth),
    }
}

fn if_modified_since(headers: &HeaderMap) -> Option<chrono::DateTime<chrono::Utc>> {
    let value = headers.get(IF_MODIFIED_SINCE)?.to_str().ok()?;
    parse_http_date(value)
}

/// Media types from the Accept header, without parameters.
fn accepted_types(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|item| {
            let media = item.split(';').next().unwrap_or_default().trim();
            (!media.is_empty()).then(|| media.to_string())
        })
        .collect()
}

fn is_xml(content_type: Option<&HeaderValue>) -> bool {
    let Some(value) = content_type.and_then(|value| value.to_str().ok()) else {
        // Undeclared bodies are parsed and judged on their own
        return true;
    };
    let media = value.split(';').next().unwrap_or_default().trim();
    media.eq_ignore_ascii_case("application/xml") || media.eq_ignore_ascii_case("text/xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::{PropStatus, PropValue};
    use crate::provider::{BodySource, Content};
    use crate::io::ContentStream;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use http_body_util::Full;
    use std::sync::Mutex;

    /// Small tree that only answers one level at a time.
    struct Shallow {
        paths: Vec<&'static str>,
        calls: Mutex<Vec<(String, OperationDepth)>>,
    }

    impl Shallow {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                paths: vec!["/", "/a", "/a/b", "/a/b/c.txt", "/d.txt", "/secret.txt"],
                calls: Mutex::new(Vec::new()),
            })
        }

        fn describe(path: &str) -> PropfindResult {
            let collection = !path.contains('.');
            let mut result = PropfindResult::new(path, collection);
            result.add(
                PropName::DisplayName,
                PropValue::text(path.rsplit('/').next().unwrap_or_default()),
            );
            result.add(PropName::GetLastModified, PropValue::Date(modified()));
            if !collection {
                result.add(PropName::GetContentLength, PropValue::text(5));
            }
            if path == "/d.txt" {
                result.add_failure(PropName::GetContentType, PropStatus::AccessDenied);
            }
            result
        }

        fn parent(path: &str) -> &str {
            match path.rfind('/') {
                Some(0) => "/",
                Some(i) => &path[..i],
                None => "/",
            }
        }
    }

    fn modified() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 17, 9, 3, 59).unwrap()
    }

    struct Hello;

    #[async_trait]
    impl BodySource for Hello {
        async fn open(&self) -> anyhow::Result<ContentStream> {
            Ok(Box::pin(&b"hello"[..]))
        }
    }

    #[async_trait]
    impl ReadableFilesystem for Shallow {
        fn supports_descendant_depth(&self) -> bool {
            false
        }

        fn enumerate_properties(
            &self,
            path: &str,
            depth: OperationDepth,
            _all_props: bool,
            _props: &BTreeSet<PropName>,
        ) -> Option<PropfindIter> {
            assert!(!depth.contains(OperationDepth::INCLUDE_DESCENDANTS));
            self.calls.lock().unwrap().push((path.to_string(), depth));
            let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
            if !self.paths.contains(&path) {
                return None;
            }
            let mut results = Vec::new();
            if depth.contains(OperationDepth::INCLUDE_SELF) {
                results.push(Shallow::describe(path));
            }
            if depth.contains(OperationDepth::INCLUDE_CHILDREN) {
                results.extend(
                    self.paths
                        .iter()
                        .filter(|p| **p != "/" && Shallow::parent(p) == path)
                        .map(|p| Shallow::describe(p)),
                );
            }
            Some(Box::new(results.into_iter()))
        }

        async fn get_content(&self, path: &str, _accept: &[String]) -> Content {
            match path {
                "/secret.txt" => Content::access_denied(),
                "/d.txt" => Content::file("text/plain", modified(), 5, Box::new(Hello)),
                "/" | "/a" | "/a/b" => Content::collection(modified()),
                _ => Content::not_found(),
            }
        }
    }

    fn handler(fs: Arc<Shallow>, prefix: &str) -> DavHandler {
        DavHandler::new(fs, prefix)
    }

    fn request(method: &str, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn body_text(response: Response<DavBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn infinite_depth_is_walked_one_level_at_a_time() {
        let fs = Shallow::new();
        let dav = handler(fs.clone(), "");
        let response = dav.handle(request("PROPFIND", "/", "")).await;
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let xml = body_text(response).await;

        let hrefs: Vec<&str> = xml
            .split("<D:href>")
            .skip(1)
            .filter_map(|rest| rest.split("</D:href>").next())
            .collect();
        assert_eq!(
            hrefs,
            ["/", "/a/", "/d.txt", "/secret.txt", "/a/b/", "/a/b/c.txt"]
        );

        let calls = fs.calls.lock().unwrap();
        assert_eq!(calls[0], ("/".to_string(), OperationDepth::ONE));
        assert!(calls[1..].iter().all(|(_, depth)| *depth == OperationDepth::ONE_NO_ROOT));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn access_denied_properties_are_reported() {
        let dav = handler(Shallow::new(), "");
        let mut req = request(
            "PROPFIND",
            "/d.txt",
            r#"<D:propfind xmlns:D="DAV:"><D:prop><D:getcontenttype/><D:getcontentlength/></D:prop></D:propfind>"#,
        );
        req.headers_mut().insert(DEPTH, HeaderValue::from_static("0"));
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=utf-8"));
        let response = dav.handle(req).await;
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let xml = body_text(response).await;
        assert!(xml.contains("<D:getcontentlength>5</D:getcontentlength>"));
        assert!(xml.contains("<D:getcontenttype/></D:prop><D:status>HTTP/1.1 403 Forbidden"));
    }

    #[tokio::test]
    async fn bad_propfind_requests() {
        let dav = handler(Shallow::new(), "");

        let mut req = request("PROPFIND", "/", "");
        req.headers_mut().insert(DEPTH, HeaderValue::from_static("2"));
        assert_eq!(dav.handle(req).await.status(), StatusCode::BAD_REQUEST);

        let mut req = request("PROPFIND", "/", "");
        req.headers_mut().append(DEPTH, HeaderValue::from_static("0"));
        req.headers_mut().append(DEPTH, HeaderValue::from_static("1"));
        assert_eq!(dav.handle(req).await.status(), StatusCode::BAD_REQUEST);

        let req = request("PROPFIND", "/", "<D:propfind xmlns:D=\"DAV:\">");
        assert_eq!(dav.handle(req).await.status(), StatusCode::BAD_REQUEST);

        let mut req = request("PROPFIND", "/", "{\"allprop\": true}");
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(dav.handle(req).await.status(), StatusCode::BAD_REQUEST);

        let big: &'static str = Box::leak("x".repeat(MAX_PROPFIND_BODY + 1).into_boxed_str());
        let req = request("PROPFIND", "/", big);
        assert_eq!(dav.handle(req).await.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let req = request("PROPFIND", "/missing", "");
        assert_eq!(dav.handle(req).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_statuses() {
        let dav = handler(Shallow::new(), "");

        let response = dav.handle(request("GET", "/d.txt", "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert_eq!(response.headers()[DAV], "1");
        assert_eq!(
            response.headers()[LAST_MODIFIED],
            "Sun, 17 May 2020 09:03:59 GMT"
        );
        assert_eq!(body_text(response).await, "hello");

        let response = dav.handle(request("GET", "/secret.txt", "")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = dav.handle(request("GET", "/nothing", "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "File not found");
    }

    #[tokio::test]
    async fn conditional_get() {
        let dav = handler(Shallow::new(), "");

        let mut req = request("GET", "/d.txt", "");
        req.headers_mut().insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 17 May 2020 09:03:59 GMT"),
        );
        let response = dav.handle(req).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(body_text(response).await, "");

        let mut req = request("GET", "/d.txt", "");
        req.headers_mut().insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 17 May 2020 09:03:58 GMT"),
        );
        assert_eq!(dav.handle(req).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn collections_render_a_listing() {
        let dav = handler(Shallow::new(), "/assets");
        let response = dav.handle(request("GET", "/assets/a", "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], listing::CONTENT_TYPE);
        let html = body_text(response).await;
        assert!(html.contains("Index of /assets/a/"));
        assert!(html.contains("<a href=\"/assets/\">../</a>"));
        assert!(html.contains("<a href=\"/assets/a/b/\">b/</a>"));
    }

    #[tokio::test]
    async fn prefix_and_methods() {
        let dav = handler(Shallow::new(), "assets/");
        assert_eq!(dav.prefix(), "/assets");

        let response = dav.handle(request("GET", "/other/d.txt", "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = dav.handle(request("GET", "/assetsd.txt", "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = dav.handle(request("GET", "/assets/d.txt", "")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = dav.handle(request("OPTIONS", "*", "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ALLOW], ALLOWED_METHODS);
        assert_eq!(response.headers()[MS_AUTHOR_VIA], "DAV");

        let response = dav.handle(request("DELETE", "/assets/d.txt", "")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_text(response).await, "No");
    }
}
