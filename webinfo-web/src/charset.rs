//! Byte-to-text decoding for fetched pages.
//!
//! Precedence: byte order mark, then the `charset` parameter of the
//! `Content-Type` header, then a `<meta>` declaration in the first 1024 bytes,
//! then UTF-8. Malformed sequences become U+FFFD.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252, X_USER_DEFINED};
use std::borrow::Cow;

const META_PRESCAN_BYTES: usize = 1024;

/// Where the chosen encoding came from. Logged with the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSource {
    Bom,
    Header,
    Meta,
    Default,
}

#[derive(Debug)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
    pub source: CharsetSource,
    pub had_errors: bool,
}

/// Decode an HTML document.
///
/// ```
/// use webinfo_web::charset::{decode_html, CharsetSource};
///
/// let page = b"<meta charset=\"iso-8859-1\"><p>Caf\xe9</p>";
/// let decoded = decode_html(page, None);
/// assert!(decoded.text.contains("Café"));
/// assert_eq!(decoded.source, CharsetSource::Meta);
/// ```
pub fn decode_html<'a>(bytes: &'a [u8], content_type: Option<&str>) -> Decoded<'a> {
    let (encoding, source) = sniff(bytes, content_type);
    // `decode` strips a BOM and lets it override the chosen encoding.
    let (text, encoding, had_errors) = encoding.decode(bytes);
    Decoded {
        text,
        encoding,
        source,
        had_errors,
    }
}

fn sniff(bytes: &[u8], content_type: Option<&str>) -> (&'static Encoding, CharsetSource) {
    if let Some((enc, _)) = Encoding::for_bom(bytes) {
        return (enc, CharsetSource::Bom);
    }
    if let Some(enc) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return (enc, CharsetSource::Header);
    }
    if let Some(enc) = meta_charset(&bytes[..bytes.len().min(META_PRESCAN_BYTES)]) {
        return (enc, CharsetSource::Meta);
    }
    (UTF_8, CharsetSource::Default)
}

/// The `charset` parameter of a media type, unquoted.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|v| !v.is_empty())
    })
}

/// Look for `charset=` inside `<meta ...>` tags. Covers both
/// `<meta charset="x">` and the `http-equiv` content form.
fn meta_charset(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut rest = &lower[..];

    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        let attrs = &tag[..end];

        if let Some(pos) = find(attrs, b"charset") {
            let label = label_after(&attrs[pos + b"charset".len()..]);
            if let Some(enc) = Encoding::for_label(label) {
                return Some(match enc {
                    // A document that could be read this far is not UTF-16.
                    e if e == UTF_16BE || e == UTF_16LE => UTF_8,
                    e if e == X_USER_DEFINED => WINDOWS_1252,
                    e => e,
                });
            }
        }
        rest = &tag[end..];
    }
    None
}

fn label_after(after: &[u8]) -> &[u8] {
    let after = trim_ascii_start(after);
    let Some(after) = after.strip_prefix(b"=") else {
        return b"";
    };
    let after = trim_ascii_start(after);
    let after = after
        .strip_prefix(b"\"")
        .or_else(|| after.strip_prefix(b"'"))
        .unwrap_or(after);
    let len = after
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(after.len());
    &after[..len]
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
