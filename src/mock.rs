use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use http::{header::CONTENT_TYPE, HeaderMap, StatusCode};

use crate::{HttpResponse, HttpTransport, SignedRequest, TransportError};

type Handler = Box<dyn Fn(&SignedRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Records every request and answers through `handler`.
pub(crate) struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<SignedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    stall_appends: bool,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&SignedRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        MockTransport {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            stall_appends: false,
        }
    }

    /// APPEND requests never complete.
    pub(crate) fn stalling_appends(mut self) -> Self {
        self.stall_appends = true;
        self
    }

    pub(crate) fn requests(&self) -> Vec<SignedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| param(r, "command").unwrap_or_default())
            .collect()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: SignedRequest) -> Result<HttpResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // let the other requests of a fan-out start before this one finishes
        tokio::task::yield_now().await;

        if self.stall_appends && param(&request, "command").as_deref() == Some("APPEND") {
            futures::future::pending::<()>().await;
        }

        let result = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: HeaderMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

/// Finds a request parameter in the query, a form body or a multipart body.
pub(crate) fn param(request: &SignedRequest, key: &str) -> Option<String> {
    if let Some((_, v)) = request.url.query_pairs().find(|(k, _)| k == key) {
        return Some(v.into_owned());
    }
    let body = request.body.as_ref()?;
    let content_type = request.headers.get(CONTENT_TYPE)?.to_str().ok()?;
    if content_type.starts_with("multipart/form-data") {
        let text = String::from_utf8_lossy(body);
        let marker = format!("name=\"{}\"\r\n\r\n", key);
        let start = text.find(&marker)? + marker.len();
        let end = text[start..].find("\r\n")? + start;
        Some(text[start..end].to_string())
    } else {
        url::form_urlencoded::parse(body)
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Extracts one decoded value out of the `Authorization` header.
pub(crate) fn oauth_param(request: &SignedRequest, key: &str) -> Option<String> {
    let header = request
        .headers
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("OAuth ")?
        .to_string();
    header.split(", ").find_map(|item| {
        let mut kv = item.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(k), Some(v)) if k == key => Some(
                percent_encoding::percent_decode_str(v.trim_matches('"'))
                    .decode_utf8_lossy()
                    .into_owned(),
            ),
            _ => None,
        }
    })
}
