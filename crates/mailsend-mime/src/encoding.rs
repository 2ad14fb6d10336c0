//! MIME encoding utilities.
//!
//! Base64 (line-wrapped for bodies), Quoted-Printable, header folding with
//! RFC 2047 encoded words and RFC 2231 parameter values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Header line length folding aims for, leaving room for the field name.
const FOLD_WIDTH: usize = 68;

/// Longest unbreakable ASCII word kept literal in a header. Anything longer
/// could push a line past the RFC 5322 limit of 998 characters.
const MAX_FOLDED_WORD: usize = 900;

/// Raw bytes that fit in one RFC 2047 encoded word (75 chars with the
/// `=?utf-8?B?` prefix and `?=` suffix).
const ENCODED_WORD_BYTES: usize = 45;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines of at most
/// [`MAX_LINE_LENGTH`] characters.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    // Base64 output is ASCII, so byte chunks are char boundaries.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out
}

/// Encodes text using Quoted-Printable (RFC 2045).
///
/// Line breaks in the input become CRLF hard breaks; long lines get soft
/// breaks; whitespace at the end of a line is encoded.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_qp_line(line.as_bytes(), &mut out);
    }
    out
}

fn encode_qp_line(bytes: &[u8], out: &mut String) {
    let mut column = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        let at_end = i + 1 == bytes.len();
        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
            || (matches!(byte, b' ' | b'\t') && !at_end);
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft break.
        if column + width > MAX_LINE_LENGTH - 1 {
            out.push_str("=\r\n");
            column = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        column += width;
    }
}

/// Encodes a header value for the wire.
///
/// Plain ASCII is kept as is and folded at whitespace once it gets long.
/// Anything else, and ASCII with a word too long to fold, becomes RFC 2047
/// `B` encoded words, several per value if needed, one per continuation
/// line.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    let plain = text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?");
    if plain && text.len() <= FOLD_WIDTH {
        return text.to_string();
    }
    if plain && text.split([' ', '\t']).all(|word| word.len() <= MAX_FOLDED_WORD) {
        return fold_ascii(text);
    }

    let mut words = Vec::new();
    let mut chunk_start = 0;
    let mut chunk_len = 0;
    for (idx, ch) in text.char_indices() {
        if chunk_len + ch.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&text[chunk_start..idx]));
            chunk_start = idx;
            chunk_len = 0;
        }
        chunk_len += ch.len_utf8();
    }
    words.push(encoded_word(&text[chunk_start..]));
    words.join("\r\n ")
}

/// Folds ASCII text by inserting CRLF before whitespace so lines stay near
/// [`FOLD_WIDTH`]. Unfolding restores the input exactly.
fn fold_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / FOLD_WIDTH * 2);
    let mut line_len = 0;
    let mut start = 0;
    let breaks = text
        .match_indices([' ', '\t'])
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    for end in breaks {
        if end == start {
            continue;
        }
        let segment = &text[start..end];
        // A continuation line may not consist of whitespace only.
        let has_word = !segment.trim_start().is_empty();
        if line_len > 0 && has_word && line_len + segment.len() > FOLD_WIDTH {
            out.push_str("\r\n");
            line_len = 0;
        }
        out.push_str(segment);
        line_len += segment.len();
        start = end;
    }
    out
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
}

/// Formats a `name=value` MIME parameter, using RFC 2231 extended
/// notation (`name*=utf-8''...`) when the value is not plain ASCII.
#[must_use]
pub fn encode_parameter(name: &str, value: &str) -> String {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("{name}=\"{escaped}\"");
    }

    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    format!("{name}*=utf-8''{encoded}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_base64(data: &str) -> Vec<u8> {
        let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(cleaned).unwrap()
    }

    fn decode_quoted_printable(data: &str) -> Vec<u8> {
        let unfolded = data.replace("=\r\n", "");
        let bytes = unfolded.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'=' {
                out.push(u8::from_str_radix(&unfolded[i + 1..i + 3], 16).unwrap());
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        out
    }

    fn unfold(value: &str) -> String {
        value.replace("\r\n", "")
    }

    #[test]
    fn test_base64_wrapped_lines() {
        let data = vec![0xABu8; 200];
        let wrapped = encode_base64_wrapped(&data);
        for line in wrapped.split_terminator("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        assert!(wrapped.ends_with("\r\n"));
        assert_eq!(decode_base64(&wrapped), data);
    }

    #[test]
    fn test_quoted_printable_ascii_passthrough() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_non_ascii() {
        assert_eq!(encode_quoted_printable("Héllo"), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_line_breaks_and_trailing_space() {
        assert_eq!(encode_quoted_printable("one \ntwo\r\nthree"), "one=20\r\ntwo\r\nthree");
    }

    #[test]
    fn test_rfc2047_ascii_untouched() {
        assert_eq!(encode_rfc2047("Hello"), "Hello");
    }

    #[test]
    fn test_long_ascii_folds_at_whitespace() {
        let subject = "Quarterly report for the northern region ".repeat(10);
        let folded = encode_rfc2047(subject.trim_end());

        let lines: Vec<&str> = folded.split("\r\n").collect();
        assert!(lines.len() > 1);
        for line in &lines[1..] {
            assert!(line.starts_with(' '), "{line:?}");
        }
        for line in &lines {
            assert!(line.len() <= FOLD_WIDTH, "{line:?}");
        }
        assert_eq!(unfold(&folded), subject.trim_end());
    }

    #[test]
    fn test_unbreakable_ascii_becomes_encoded_words() {
        let subject = "x".repeat(1200);
        let encoded = encode_rfc2047(&subject);
        for line in encoded.split("\r\n") {
            let word = line.trim_start();
            assert!(word.starts_with("=?utf-8?B?"), "{word}");
            assert!(word.len() <= 75);
        }
    }

    #[test]
    fn test_folding_keeps_runs_of_spaces() {
        let subject = format!("{}   {}", "a".repeat(70), "b".repeat(20));
        let folded = encode_rfc2047(&subject);
        assert!(folded.split("\r\n").all(|line| !line.trim().is_empty()));
        assert_eq!(unfold(&folded), subject);
    }

    #[test]
    fn test_rfc2047_encodes_utf8() {
        assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let subject = "ü".repeat(60);
        let encoded = encode_rfc2047(&subject);
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        for word in &words {
            assert!(word.len() <= 75, "{word}");
        }
        let decoded: String = words
            .iter()
            .map(|w| {
                let b64 = w.trim_start_matches("=?utf-8?B?").trim_end_matches("?=");
                String::from_utf8(decode_base64(b64)).unwrap()
            })
            .collect();
        assert_eq!(decoded, subject);
    }

    #[test]
    fn test_encode_parameter() {
        assert_eq!(encode_parameter("filename", "photo.jpg"), "filename=\"photo.jpg\"");
        assert_eq!(
            encode_parameter("filename", "my \"cv\".pdf"),
            "filename=\"my \\\"cv\\\".pdf\""
        );
        assert_eq!(
            encode_parameter("filename", "résumé.pdf"),
            "filename*=utf-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_lines_are_short(text in "\\PC{0,400}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
                prop_assert!(line.is_ascii());
            }
        }

        #[test]
        fn prop_quoted_printable_decodes(text in "\\PC{0,400}") {
            let decoded = decode_quoted_printable(&encode_quoted_printable(&text));
            prop_assert_eq!(String::from_utf8(decoded).unwrap(), text);
        }

        #[test]
        fn prop_base64_wrapped_decodes(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let wrapped = encode_base64_wrapped(&data);
            prop_assert_eq!(decode_base64(&wrapped), data);
        }
    }
}
