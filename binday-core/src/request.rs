//! Outbound request description shared by all adapters.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};

use crate::ports::PortError;

#[derive(Debug, Clone)]
/// A fully built upstream request, inspectable before it is sent.
pub struct UpstreamRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// Headers sent verbatim.
    pub headers: HeaderMap,
    /// Encoded body, if any.
    pub body: Option<Vec<u8>>,
}

impl UpstreamRequest {
    /// Create a `GET` request without a body.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a `POST` request whose `Content-Type` and `Content-Length`
    /// describe `body` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidQuery`] if `content_type` is not a valid header value.
    pub fn post(
        url: impl Into<String>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Self, PortError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        Ok(Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Some(body),
        })
    }

    /// Add a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidQuery`] if `value` contains characters not
    /// allowed in a header.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, PortError> {
        self.headers.insert(name, header_value(value)?);
        Ok(self)
    }

    /// Length in bytes of the encoded body.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, PortError> {
    HeaderValue::from_str(value)
        .map_err(|_err| PortError::InvalidQuery(String::from("header value is not valid ASCII")))
}

/// Send a request and return its body as text.
///
/// # Errors
///
/// Returns [`PortError::UpstreamStatus`] for non-2xx answers and
/// [`PortError::Transport`] for connection or decoding failures.
pub async fn send_text(client: &Client, request: UpstreamRequest) -> Result<String, PortError> {
    let mut builder = client
        .request(request.method, &request.url)
        .headers(request.headers);

    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(PortError::from)?;
    let status = response.status();

    if !status.is_success() {
        return Err(PortError::UpstreamStatus(status.as_u16()));
    }

    response.text().await.map_err(PortError::from)
}
