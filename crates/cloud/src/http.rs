//! HTTP transport seam shared by every adapter.
//!
//! Adapters only see [`HttpTransport`], so tests can swap in a recording
//! double and assert on the exact requests issued (or that none were).
//! There is no retry policy: a failed request fails the operation.

use std::future::Future;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::debug;

use crate::error::{CloudError, Result};

/// Longest raw-text excerpt quoted in an error message.
const EXCERPT_LEN: usize = 200;

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.map(String::from),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with a descriptive error unless the status is 2xx.
    ///
    /// Structured error bodies (OGC exception XML, JSON `{error}`) count as a
    /// remote service error; anything else is a transport failure.
    pub fn ensure_success(&self, url: &str, service: &'static str) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        match structured_error(self) {
            Some(message) => Err(CloudError::RemoteService { service, message }),
            None => Err(CloudError::Status {
                url: url.to_string(),
                status: self.status,
                message: excerpt(&self.text()),
            }),
        }
    }
}

/// Asynchronous HTTP operations used by the adapters.
pub trait HttpTransport: Send + Sync {
    /// GET a URL and read the whole body.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse>> + Send;

    /// POST a JSON document and read the whole body.
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Real transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    async fn read(resp: reqwest::Response) -> Result<HttpResponse> {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        debug!(url, "GET");
        let resp = self.client.get(url).send().await?;
        Self::read(resp).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        debug!(url, "POST");
        let resp = self.client.post(url).json(body).send().await?;
        Self::read(resp).await
    }
}

// ── Error bodies ─────────────────────────────────────────────────────────

/// Best-effort human message for a non-success or unexpected body:
/// OGC exception text, JSON error message, or a raw-text excerpt.
pub fn describe_error_body(response: &HttpResponse) -> String {
    structured_error(response).unwrap_or_else(|| {
        let text = response.text();
        if text.trim().is_empty() {
            format!("HTTP {} with an empty body", response.status)
        } else {
            excerpt(&text)
        }
    })
}

fn structured_error(response: &HttpResponse) -> Option<String> {
    let text = response.text();
    let trimmed = text.trim_start();
    if trimmed.starts_with('<') {
        return exception_text(trimmed);
    }
    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return json_error_message(&value);
    }
    None
}

/// Text of OGC exception elements, if the document carries any.
pub fn exception_text(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut depth_in_exception = 0usize;
    let mut saw_exception = false;
    let mut messages: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if is_exception_element(e.local_name().as_ref()) {
                    depth_in_exception += 1;
                    saw_exception = true;
                } else if depth_in_exception > 0 {
                    depth_in_exception += 1;
                }
            }
            Ok(Event::Empty(e)) if is_exception_element(e.local_name().as_ref()) => {
                saw_exception = true;
            }
            Ok(Event::End(_)) if depth_in_exception > 0 => depth_in_exception -= 1,
            Ok(Event::Text(t)) if depth_in_exception > 0 => {
                if let Ok(s) = t.unescape() {
                    let s = s.trim();
                    if !s.is_empty() {
                        messages.push(s.to_string());
                    }
                }
            }
            Ok(Event::CData(t)) if depth_in_exception > 0 => {
                let s = String::from_utf8_lossy(&t).trim().to_string();
                if !s.is_empty() {
                    messages.push(s);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    if !saw_exception {
        return None;
    }
    messages.dedup();
    Some(if messages.is_empty() {
        "service exception without message".to_string()
    } else {
        messages.join("; ")
    })
}

/// Element local names that mark an OGC service exception.
///
/// A bare `Exception` is not one: WMS capabilities use it to list the
/// supported exception formats. Inside an OWS `ExceptionReport` it is
/// covered by the enclosing report.
pub fn is_exception_element(local_name: &[u8]) -> bool {
    matches!(
        local_name,
        b"ServiceExceptionReport" | b"ServiceException" | b"ExceptionReport" | b"ExceptionText"
    )
}

fn json_error_message(value: &serde_json::Value) -> Option<String> {
    let obj = value.as_object()?;
    let error = obj.get("error").and_then(|e| match e {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(o) => o
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        _ => None,
    });
    let message = obj
        .get("message")
        .or_else(|| obj.get("description"))
        .and_then(|m| m.as_str())
        .map(String::from);
    let details = obj.get("details").and_then(|d| match d {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    });

    match (error.or(message), details) {
        (Some(e), Some(d)) => Some(format!("{}: {}", e, d)),
        (Some(e), None) => Some(e),
        (None, Some(d)) => Some(d),
        (None, None) => None,
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(EXCERPT_LEN).collect();
    if trimmed.chars().count() > EXCERPT_LEN {
        out.push('…');
    }
    out
}

// ── Test double ──────────────────────────────────────────────────────────

/// In-memory transport that replays canned responses and records requests.
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::{HttpResponse, HttpTransport};
    use crate::error::{CloudError, Result};

    /// One request seen by [`RecordingTransport`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub body: Option<serde_json::Value>,
    }

    #[derive(Default)]
    struct Inner {
        routes: Vec<(String, std::result::Result<HttpResponse, String>)>,
        requests: Vec<RecordedRequest>,
    }

    /// Responses are matched by URL substring, first registered route wins.
    /// Unmatched requests fail as a transport error.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        inner: Arc<Mutex<Inner>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, url_contains: &str, response: HttpResponse) -> Self {
            if let Ok(mut inner) = self.inner.lock() {
                inner.routes.push((url_contains.to_string(), Ok(response)));
            }
            self
        }

        pub fn fail(self, url_contains: &str, message: &str) -> Self {
            if let Ok(mut inner) = self.inner.lock() {
                inner
                    .routes
                    .push((url_contains.to_string(), Err(message.to_string())));
            }
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.inner
                .lock()
                .map(|inner| inner.requests.clone())
                .unwrap_or_default()
        }

        fn answer(&self, request: RecordedRequest) -> Result<HttpResponse> {
            let mut inner = self
                .inner
                .lock()
                .map_err(|_| CloudError::Network("transport double poisoned".into()))?;
            let url = request.url.clone();
            inner.requests.push(request);
            let found = inner
                .routes
                .iter()
                .find(|(pattern, _)| url.contains(pattern.as_str()))
                .map(|(_, r)| r.clone());
            match found {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(message)) => Err(CloudError::Network(message)),
                None => Err(CloudError::Network(format!("no route for {}", url))),
            }
        }
    }

    impl HttpTransport for RecordingTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse> {
            self.answer(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                body: None,
            })
        }

        async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
            self.answer(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                body: Some(body.clone()),
            })
        }
    }
}
