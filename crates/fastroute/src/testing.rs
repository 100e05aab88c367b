//! Test support: an in-memory response writer that records everything a
//! handler or the dispatch machinery produces.

use crate::handler::ResponseWriter;

/// Response writer capturing status, headers and body for assertions.
#[derive(Debug, Default)]
pub struct RecordedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RecordedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as UTF-8, lossy for binary payloads.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl ResponseWriter for RecordedResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn insert_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    fn write_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn bytes_written(&self) -> u64 {
        self.body.len() as u64
    }
}
