//! Responses the pipeline can rewrite.
//!
//! The pipeline only needs to read a header, read and replace the body, and
//! attach extra headers. [`HtmlResponse`] is that surface; the preview server
//! and the `optimize` command both go through [`BufferedResponse`].

/// A response whose HTML body can be rewritten in place.
pub trait HtmlResponse {
    /// Header value by name, matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    fn body(&self) -> &str;

    fn set_body(&mut self, body: String);

    /// Append a header. Existing headers with the same name are kept.
    fn add_header(&mut self, name: &str, value: String);
}

/// In-memory response: a header list and a UTF-8 body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    headers: Vec<(String, String)>,
    body: String,
}

impl BufferedResponse {
    /// Response without any headers.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Response labelled `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(body).with_header("Content-Type", "text/html; charset=utf-8")
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value.to_string());
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn into_parts(self) -> (Vec<(String, String)>, String) {
        (self.headers, self.body)
    }
}

impl HtmlResponse for BufferedResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn set_body(&mut self, body: String) {
        self.body = body;
    }

    fn add_header(&mut self, name: &str, value: String) {
        self.headers.push((name.to_string(), value));
    }
}
