//! MIME header handling.

use crate::error::{Error, Result};
use std::fmt;

/// Ordered collection of email headers.
///
/// Names keep the case they were added with; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid field name or the value
    /// contains a bare line break (which would allow header injection).
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;
        self.entries.push((name, value));
        Ok(())
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("bad field name {name:?}")));
    }

    // Folded continuation lines ("\r\n" followed by whitespace) are allowed.
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' || b == b'\r' {
            let folded = b == b'\r'
                && bytes.get(i + 1) == Some(&b'\n')
                && matches!(bytes.get(i + 2), Some(b' ' | b'\t'));
            let after_cr = b == b'\n'
                && i > 0
                && bytes[i - 1] == b'\r'
                && matches!(bytes.get(i + 1), Some(b' ' | b'\t'));
            if !(folded || after_cr) {
                return Err(Error::InvalidHeader(format!(
                    "{name} contains a line break"
                )));
            }
        }
    }
    Ok(())
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_add_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain").unwrap();
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_repeated_headers_keep_first_for_get() {
        let mut headers = Headers::new();
        headers.add("To", "alice@example.com").unwrap();
        headers.add("to", "bob@example.com").unwrap();
        assert_eq!(headers.get("TO"), Some("alice@example.com"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let mut headers = Headers::new();
        headers.add("To", "r@example.com").unwrap();
        headers.add("From", "s@example.com").unwrap();
        headers.add("Subject", "Hi").unwrap();

        assert_eq!(
            headers.to_string(),
            "To: r@example.com\r\nFrom: s@example.com\r\nSubject: Hi\r\n"
        );
    }

    #[test]
    fn test_rejects_header_injection() {
        let mut headers = Headers::new();
        assert!(headers.add("To", "a@example.com\r\nBcc: evil@example.com").is_err());
        assert!(headers.add("Subject", "line\nbreak").is_err());
        assert!(headers.add("Bad Name", "x").is_err());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_allows_folded_value() {
        let mut headers = Headers::new();
        headers
            .add("Subject", "=?utf-8?B?AAAA?=\r\n =?utf-8?B?BBBB?=")
            .unwrap();
        assert_eq!(headers.len(), 1);
    }
}
