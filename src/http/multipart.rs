//! Multipart form data support.
//!
//! Provides RFC 2046 multipart/form-data encoding for file uploads. The
//! encoded body is produced from a borrowed [`Form`] so the request pipeline
//! can rebuild it on every retry attempt.

use bytes::Bytes;
use rand::Rng;
use std::borrow::Cow;

/// A multipart form for file uploads.
#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            fields: Vec::new(),
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N, V>(self, name: N, value: V) -> Self
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Add a custom part.
    pub fn part<N>(mut self, name: N, part: Part) -> Self
    where
        N: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// The `Content-Type` header value for this form.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Total encoded length in bytes.
    pub fn content_length(&self) -> usize {
        self.to_bytes().len()
    }

    /// Encode the form into a body.
    ///
    /// Borrows `self`, so the same form encodes identically on every retry.
    pub fn to_bytes(&self) -> Bytes {
        if self.fields.is_empty() {
            return Bytes::new();
        }

        let mut output = Vec::new();

        for (name, part) in &self.fields {
            output.extend_from_slice(b"--");
            output.extend_from_slice(self.boundary.as_bytes());
            output.extend_from_slice(b"\r\n");

            output.extend_from_slice(part.format_headers(name).as_bytes());
            output.extend_from_slice(b"\r\n\r\n");

            output.extend_from_slice(&part.data);
            output.extend_from_slice(b"\r\n");
        }

        // Final boundary: --boundary--\r\n
        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"--\r\n");

        Bytes::from(output)
    }
}

/// A part of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    data: Bytes,
    content_type: Option<String>,
    file_name: Option<Cow<'static, str>>,
}

impl Part {
    /// Create a text part.
    pub fn text<V>(value: V) -> Self
    where
        V: Into<Cow<'static, str>>,
    {
        let s = value.into();
        Self {
            data: Bytes::from(s.into_owned()),
            content_type: Some("text/plain; charset=utf-8".to_string()),
            file_name: None,
        }
    }

    /// Create a part from bytes.
    pub fn bytes<B>(data: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self {
            data: data.into(),
            content_type: None,
            file_name: None,
        }
    }

    /// Set the content type.
    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Set the file name.
    pub fn file_name<S>(mut self, name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.file_name = Some(name.into());
        self
    }

    fn format_headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        );

        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
        }

        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }

        header
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Escape quotes and CR/LF in a header parameter value.
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') || s.contains('\\') || s.contains('\r') || s.contains('\n') {
        Cow::Owned(
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\r', "\\r")
                .replace('\n', "\\n"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

fn generate_boundary() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "----restnet-boundary-{:016x}{:016x}",
        rng.gen::<u64>(),
        rng.gen::<u64>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_form() {
        let form = Form::new();
        assert!(form.to_bytes().is_empty());
    }

    #[test]
    fn text_field() {
        let form = Form::new().text("name", "value");
        let body = form.to_bytes();

        let body_str = String::from_utf8_lossy(&body);
        assert!(body_str.contains("name=\"name\""));
        assert!(body_str.contains("value"));
    }

    #[test]
    fn file_part() {
        let part = Part::bytes(b"file data".as_slice())
            .file_name("test.txt")
            .content_type("text/plain");

        let form = Form::new().part("upload", part);
        let body_str = String::from_utf8_lossy(&form.to_bytes()).into_owned();
        assert!(body_str.contains("filename=\"test.txt\""));
        assert!(body_str.contains("Content-Type: text/plain"));
        assert!(body_str.contains("file data"));
    }

    #[test]
    fn boundary_format() {
        let form = Form::new();
        assert!(form.boundary().starts_with("----restnet-boundary-"));
        assert!(form
            .content_type()
            .starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn encoding_is_repeatable() {
        let form = Form::new().text("key", "value");
        let first = form.to_bytes();
        let second = form.to_bytes();
        assert_eq!(first, second);
        assert_eq!(form.content_length(), first.len());
    }

    #[test]
    fn escapes_quotes_in_names() {
        assert_eq!(escape_quotes("normal"), "normal");
        assert_eq!(escape_quotes("with\"quote"), "with\\\"quote");
        assert_eq!(escape_quotes("with\\slash"), "with\\\\slash");
    }

    #[test]
    fn multiple_parts_end_with_final_boundary() {
        let form = Form::new()
            .text("field1", "value1")
            .text("field2", "value2")
            .part(
                "file",
                Part::bytes(b"binary".as_slice()).file_name("data.bin"),
            );

        let body_str = String::from_utf8_lossy(&form.to_bytes()).into_owned();
        assert!(body_str.contains("field1"));
        assert!(body_str.contains("value2"));
        assert!(body_str.contains("data.bin"));
        assert!(body_str.ends_with("--\r\n"));
    }
}
